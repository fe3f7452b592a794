//! Loads an externally built WebAssembly module and binds its output to a drawable surface.
//!
//! The module (typically a native SDL-style program compiled elsewhere) is brought up in
//! two stages: a small **loader script** is fetched and executed once per process, then the
//! **runtime** fetches the module binary and its data asset, instantiates it with
//! [Wasmtime](https://docs.rs/wasmtime) and reports back exactly once, either ready or aborted.
//!
//! # Core Concepts
//!
//! - [`HostSurface`]: Owns a [`SurfaceHandle`] and the status shown next to it
//! 	(`Loading`, `Ready` or `Error`). Starts at most one [`LoadSession`] for its surface
//! 	and, once ready, runs the module's main loop against it.
//!
//! - [`ModuleLoader`]: Injects the loader script at most once, hands the registered
//! 	[`RuntimeConfig`] to the runtime and resolves every [`ModuleLoader::load`] call
//! 	to a [`ModuleHandle`] or a [`LoadError`].
//!
//! - [`RuntimeConfig`]: The configuration the runtime consults while initializing: the
//! 	surface to render into, asset routing, two text sinks and the completion / abort
//! 	callbacks.
//!
//! - [`LoaderScript`]: The TOML bootstrap naming the module binary and its data asset,
//! 	fetched from an [`AssetSite`].
//!
//! # Failures
//!
//! Exactly two failure origins exist and both end the session for good:
//!
//! - [`LoadError::ScriptLoad`]: the loader script was unreachable or malformed. The runtime
//! 	never starts, so the abort callback is not called.
//! - [`LoadError::RuntimeAbort`]: the runtime began initializing but could not finish (missing
//! 	or corrupt binary, missing data asset, the module called `abort`, a trap in
//! 	`_initialize`). The abort callback receives the same diagnostic.
//!
//! # Example
//!
//! ```no_run
//! use wasm_canvas::{ AssetSite, Engine, HostStatus, HostSurface, ModuleLoader };
//!
//! # #[tokio::main( flavor = "current_thread" )]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // `public/wasm/simple.toml` names the binary and data asset, both also under `public/wasm/`.
//! let loader = ModuleLoader::new( Engine::default(), AssetSite::new( "public" ));
//!
//! let mut host = HostSurface::default();
//! host.surface_available( &loader );
//! // Re-rendering the same host never starts a second load.
//! assert!( !host.surface_available( &loader ));
//!
//! match host.settled().await {
//! 	HostStatus::Ready => {
//! 		// The host already ran `main` and keeps ticking `frame` into its surface.
//! 		let module = host.module().expect( "ready hosts hold their module" );
//! 		module.pointer_down( 100, 220 )?;
//! 	}
//! 	HostStatus::Error( error ) => eprintln!( "{}", error ),
//! 	HostStatus::Loading => unreachable!(),
//! }
//! # Ok(())
//! # }
//! ```

mod config ;
mod host ;
mod loader ;
mod runtime ;
mod script ;
mod session ;
mod surface ;

#[doc( no_inline )]
pub use wasmtime::Engine ;

pub use config::{ RuntimeConfig, LocateFile, OutputSink, default_locate_file, DEFAULT_ASSET_DIR };
pub use host::{ HostSurface, HostStatus, FRAME_INTERVAL };
pub use loader::{ ModuleLoader, LoaderPhase, LoadError, DEFAULT_SCRIPT_PATH };
pub use runtime::{ ModuleHandle, InvocationError };
pub use script::{ AssetSite, FetchError, LoaderScript, ScriptError };
pub use session::{ LoadSession, SessionStatus, TransitionError };
pub use surface::{ Surface, SurfaceHandle, WeakSurface, SurfaceError, DEFAULT_WIDTH, DEFAULT_HEIGHT };
