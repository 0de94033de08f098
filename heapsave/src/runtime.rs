//! WASM runtime implementation for heapsave
//!
//! This module loads a guest module with wasmtime, provides the host
//! functions it imports, and runs one of its exported entry points. The
//! `download` import is served by [`DownloadTrigger`] reading straight out of
//! the guest's exported memory.

use crate::config::RuntimeConfig;
use crate::error::{Error, Result};
use anyhow::Context;
use heapsave_support::memory::{abi_to_usize, read_bytes};
use heapsave_support::{DownloadRequest, DownloadTrigger, SavePlatform, SaveReceipt};
use std::path::Path;
use wasmtime::{
    Caller, Config, Engine, Extern, ExternType, Linker, Module, Store, StoreLimits,
    StoreLimitsBuilder, Val, ValType,
};

/// Name of the download import inside the configured import module
pub const DOWNLOAD_IMPORT: &str = "download";

/// State stored in the wasmtime `Store` for one run
pub struct HostState<P: SavePlatform> {
    /// Platform downloads are offered through
    platform: P,

    trigger: DownloadTrigger,

    /// Export name of the guest memory to read from
    memory_export: String,

    /// One receipt per completed download, in call order
    receipts: Vec<SaveReceipt>,

    limits: StoreLimits,
}

impl<P: SavePlatform> HostState<P> {
    fn new(platform: P, config: &RuntimeConfig) -> Self {
        Self {
            platform,
            trigger: DownloadTrigger::new().with_mime_type(config.mime_type.clone()),
            memory_export: config.memory_export.clone(),
            receipts: Vec::new(),
            limits: StoreLimitsBuilder::new()
                .memory_size(config.max_memory_bytes)
                .build(),
        }
    }
}

/// Outcome of [`WasmRuntime::run`]
#[derive(Debug)]
pub struct RunReport<P> {
    /// The platform passed to `run`, handed back for inspection
    pub platform: P,

    /// Downloads the guest completed
    pub receipts: Vec<SaveReceipt>,

    /// Values returned by the entry point
    pub results: Vec<i32>,
}

/// How a module declares the download import
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadImport {
    /// The module never imports `download`
    Missing,
    /// `download(i32, i32, i32)` with no results
    Valid,
    /// Imported with some other type, described in the payload
    Mismatched(String),
}

/// Summary of a module's interface
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    /// `module.name: kind` for every import
    pub imports: Vec<String>,
    /// `name: kind` for every export
    pub exports: Vec<String>,
    pub download_import: DownloadImport,
}

/// WASM runtime for executing guest modules
pub struct WasmRuntime {
    engine: Engine,
    module: Module,
    config: RuntimeConfig,
}

impl std::fmt::Debug for WasmRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmRuntime")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl WasmRuntime {
    fn create_engine() -> Result<Engine> {
        let mut config = Config::new();
        config.cranelift_opt_level(wasmtime::OptLevel::Speed);
        config.consume_fuel(false);
        config.epoch_interruption(false);
        config.max_wasm_stack(1024 * 1024);
        config.wasm_memory64(false);
        config.wasm_multi_memory(false);
        config.wasm_bulk_memory(true);
        config.wasm_reference_types(true);
        config.wasm_simd(true);

        Engine::new(&config).map_err(|e| Error::Wasm(format!("Failed to create wasmtime engine: {}", e)))
    }

    /// Create a new runtime from a module file
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the module cannot
    /// be loaded
    pub fn new<P: AsRef<Path>>(wasm_path: P, config: RuntimeConfig) -> Result<Self> {
        config.validate()?;
        let engine = Self::create_engine()?;
        let module = Module::from_file(&engine, wasm_path.as_ref()).map_err(|e| {
            Error::Wasm(format!(
                "Failed to load WASM module {}: {}",
                wasm_path.as_ref().display(),
                e
            ))
        })?;
        Ok(Self { engine, module, config })
    }

    /// Create a new runtime from module bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the bytes are not
    /// a valid module
    pub fn from_bytes(wasm_bytes: &[u8], config: RuntimeConfig) -> Result<Self> {
        config.validate()?;
        let engine = Self::create_engine()?;
        let module = Module::from_binary(&engine, wasm_bytes)
            .map_err(|e| Error::Wasm(format!("Failed to load WASM module from bytes: {}", e)))?;
        Ok(Self { engine, module, config })
    }

    /// Create a new runtime from the WebAssembly text format
    ///
    /// # Errors
    ///
    /// Returns an error if the text does not parse or compile
    pub fn from_wat(wat: &str, config: RuntimeConfig) -> Result<Self> {
        let wasm_bytes = wat::parse_str(wat)
            .map_err(|e| Error::Wasm(format!("Failed to parse WAT: {}", e)))?;
        Self::from_bytes(&wasm_bytes, config)
    }

    /// The configuration this runtime was built with
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Build a linker with every host function a guest may import
    fn linker<P: SavePlatform + 'static>(&self) -> Result<Linker<HostState<P>>> {
        let mut linker = Linker::new(&self.engine);
        let env_module = self.config.import_module.as_str();

        linker
            .func_wrap(
                env_module,
                DOWNLOAD_IMPORT,
                |mut caller: Caller<'_, HostState<P>>,
                 filename_ptr: i32,
                 data_ptr: i32,
                 size: i32|
                 -> anyhow::Result<()> {
                    let memory = guest_memory(&mut caller)?;
                    let (data, state) = memory.data_and_store_mut(&mut caller);

                    // Copy out before touching the platform; the borrow of
                    // guest memory ends here.
                    let request = DownloadRequest::from_memory(
                        &*data,
                        abi_to_usize(filename_ptr),
                        abi_to_usize(data_ptr),
                        abi_to_usize(size),
                    )?;
                    let receipt = state.trigger.save(&state.platform, &request)?;
                    state.receipts.push(receipt);
                    Ok(())
                },
            )
            .map_err(|e| Error::Wasm(format!("Failed to register {}: {}", DOWNLOAD_IMPORT, e)))?;

        linker
            .func_wrap(
                env_module,
                "__stdout",
                |mut caller: Caller<'_, HostState<P>>, ptr: i32| -> anyhow::Result<()> {
                    let message = read_guest_text(&mut caller, ptr)?;
                    log::info!("[WASM stdout] {}", message.trim_end());
                    Ok(())
                },
            )
            .map_err(|e| Error::Wasm(format!("Failed to register __stdout: {}", e)))?;

        linker
            .func_wrap(
                env_module,
                "__stderr",
                |mut caller: Caller<'_, HostState<P>>, ptr: i32| -> anyhow::Result<()> {
                    let message = read_guest_text(&mut caller, ptr)?;
                    log::warn!("[WASM stderr] {}", message.trim_end());
                    Ok(())
                },
            )
            .map_err(|e| Error::Wasm(format!("Failed to register __stderr: {}", e)))?;

        Ok(linker)
    }

    /// Instantiate the guest and call `entry` with `args`
    ///
    /// # Arguments
    ///
    /// * `platform` - Where the guest's downloads are offered
    /// * `entry` - Name of an exported function taking only `i32` parameters
    /// * `args` - Arguments for `entry`
    ///
    /// # Errors
    ///
    /// Returns an error if instantiation fails, `entry` is missing or has the
    /// wrong signature, or the call traps. A failed download traps the call.
    pub fn run<P: SavePlatform + 'static>(
        &self,
        platform: P,
        entry: &str,
        args: &[i32],
    ) -> Result<RunReport<P>> {
        let mut store = Store::new(&self.engine, HostState::new(platform, &self.config));
        store.limiter(|state| &mut state.limits);

        let linker = self.linker::<P>()?;
        let instance = linker
            .instantiate(&mut store, &self.module)
            .map_err(|e| Error::Wasm(format!("Failed to instantiate WASM module: {}", e)))?;

        let func = instance
            .get_func(&mut store, entry)
            .ok_or_else(|| Error::Wasm(format!("Guest does not export function `{}`", entry)))?;
        let ty = func.ty(&store);
        if ty.params().len() != args.len() || !ty.params().all(|p| matches!(p, ValType::I32)) {
            return Err(Error::Wasm(format!(
                "`{}` expects {} parameters, all i32; got {} arguments",
                entry,
                ty.params().len(),
                args.len()
            )));
        }

        let params: Vec<Val> = args.iter().map(|&arg| Val::I32(arg)).collect();
        let mut results = vec![Val::I32(0); ty.results().len()];

        log::debug!("Calling `{}` with {:?}", entry, args);
        func.call(&mut store, &params, &mut results)
            .with_context(|| format!("Failed to call `{}`", entry))?;

        let results = results
            .iter()
            .map(|val| {
                val.i32()
                    .ok_or_else(|| Error::Wasm(format!("`{}` returned a non-i32 value", entry)))
            })
            .collect::<Result<Vec<i32>>>()?;

        let state = store.into_data();
        log::debug!("`{}` completed {} downloads", entry, state.receipts.len());
        Ok(RunReport {
            platform: state.platform,
            receipts: state.receipts,
            results,
        })
    }

    /// Describe the module's imports and exports
    pub fn inspect(&self) -> ModuleInfo {
        let mut download_import = DownloadImport::Missing;
        let imports = self
            .module
            .imports()
            .map(|import| {
                if import.module() == self.config.import_module && import.name() == DOWNLOAD_IMPORT {
                    download_import = check_download_import(&import.ty());
                }
                format!("{}.{}: {}", import.module(), import.name(), describe(&import.ty()))
            })
            .collect();
        let exports = self
            .module
            .exports()
            .map(|export| format!("{}: {}", export.name(), describe(&export.ty())))
            .collect();

        ModuleInfo {
            imports,
            exports,
            download_import,
        }
    }

    /// Create a runtime around a guest that saves "fractal.raw"
    ///
    /// The guest's `main` downloads `[1, 2, 3, 4]`; `save(ptr, size)`
    /// downloads an arbitrary range under the same name.
    #[cfg(any(test, feature = "testing"))]
    pub fn for_testing(config: RuntimeConfig) -> Result<Self> {
        Self::from_wat(
            r#"
            (module
                (import "env" "download" (func $download (param i32 i32 i32)))
                (memory (export "memory") 1)
                (data (i32.const 16) "fractal.raw\00")
                (data (i32.const 64) "\01\02\03\04")
                (func (export "main")
                    (call $download (i32.const 16) (i32.const 64) (i32.const 4)))
                (func (export "save") (param $ptr i32) (param $size i32) (result i32)
                    (call $download (i32.const 16) (local.get $ptr) (local.get $size))
                    (i32.const 0))
            )
            "#,
            config,
        )
    }
}

/// Look up the configured memory export of the calling guest
fn guest_memory<P: SavePlatform>(caller: &mut Caller<'_, HostState<P>>) -> anyhow::Result<wasmtime::Memory> {
    let export = caller.data().memory_export.clone();
    match caller.get_export(&export) {
        Some(Extern::Memory(memory)) => Ok(memory),
        _ => {
            log::error!("No memory export `{}` found in WASM module", export);
            Err(heapsave_support::Error::MissingMemory(export).into())
        }
    }
}

/// Read a length-prefixed (u32 little endian) UTF-8 message from the guest
fn read_guest_text<P: SavePlatform>(caller: &mut Caller<'_, HostState<P>>, ptr: i32) -> anyhow::Result<String> {
    let memory = guest_memory(caller)?;
    let data = memory.data(&*caller);
    let ptr = abi_to_usize(ptr);

    let len_bytes = read_bytes(data, ptr, 4)?;
    let len = u32::from_le_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;
    let message = read_bytes(data, ptr + 4, len)?;
    Ok(String::from_utf8_lossy(&message).into_owned())
}

fn check_download_import(ty: &ExternType) -> DownloadImport {
    match ty {
        ExternType::Func(func) => {
            let params_ok = func.params().len() == 3 && func.params().all(|p| matches!(p, ValType::I32));
            if params_ok && func.results().len() == 0 {
                DownloadImport::Valid
            } else {
                DownloadImport::Mismatched(describe(ty))
            }
        }
        other => DownloadImport::Mismatched(describe(other)),
    }
}

fn describe(ty: &ExternType) -> String {
    match ty {
        ExternType::Func(func) => {
            let params: Vec<String> = func.params().map(|p| p.to_string()).collect();
            let results: Vec<String> = func.results().map(|r| r.to_string()).collect();
            format!("func({}) -> ({})", params.join(", "), results.join(", "))
        }
        ExternType::Memory(memory) => format!("memory(min {} pages)", memory.minimum()),
        ExternType::Table(_) => "table".to_string(),
        ExternType::Global(_) => "global".to_string(),
    }
}
