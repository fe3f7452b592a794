//! The module loader.
//!
//! A [`ModuleLoader`] owns the one-time side effects of bringing a module up: it injects
//! the loader script at most once, hands the registered [`RuntimeConfig`] to the runtime,
//! and publishes the outcome to every [`ModuleLoader::load`] call waiting on it.
//!
//! The protocol is `Idle → FetchingCode → InitializingRuntime → { Ready | Aborted }`.
//! Terminal phases are sticky for the lifetime of the loader.

use std::sync::{ Arc, Mutex };
use thiserror::Error ;
use tokio::sync::watch ;
use wasmtime::Engine ;

use crate::config::{ RuntimeConfig, DEFAULT_ASSET_DIR };
use crate::runtime::{ self, ModuleHandle };
use crate::script::{ self, AssetSite, LoaderScript };

/// Path of the loader script unless configured otherwise.
pub const DEFAULT_SCRIPT_PATH: &str = "/wasm/simple.toml" ;

/// Errors a load session can resolve with.
///
/// Both kinds are terminal; the loader never retries.
#[derive( Error, Debug, Clone, PartialEq, Eq )]
pub enum LoadError {
	/// The loader script could not be fetched or executed.
	#[error( "Failed to load WebAssembly script {path}: {reason}" )]
	ScriptLoad { path: String, reason: String },
	/// The runtime started initializing but aborted before becoming callable.
	#[error( "Module aborted: {what}" )]
	RuntimeAbort { what: String },
}

/// Where the loader is in its acquisition protocol.
#[derive( Debug, Clone, Default )]
pub enum LoaderPhase {
	/// No load has been requested yet.
	#[default] Idle,
	/// The loader script is being fetched.
	FetchingCode,
	/// The runtime is fetching, compiling and initializing the module.
	InitializingRuntime,
	/// The module is callable.
	Ready( ModuleHandle ),
	/// Acquisition failed for good.
	Aborted( LoadError ),
}

impl LoaderPhase {

	/// Whether no further transitions can happen.
	pub fn is_terminal( &self ) -> bool { matches!( self, Self::Ready( _ ) | Self::Aborted( _ )) }

	fn outcome( &self ) -> Option<Result<ModuleHandle, LoadError>> {
		match self {
			Self::Ready( handle ) => Some( Ok( handle.clone() )),
			Self::Aborted( error ) => Some( Err( error.clone() )),
			_ => None,
		}
	}

}

#[derive( Default )]
struct LoaderState {
	registered: Option<RuntimeConfig>,
	script_injected: bool,
	injections: usize,
}

struct LoaderShared {
	state: Mutex<LoaderState>,
	phase: watch::Sender<LoaderPhase>,
}

/// Acquires and initializes the module, once, for every host that asks.
///
/// The loader is a handle; clones share the same injection state and outcome.
#[derive( Clone )]
pub struct ModuleLoader {
	engine: Engine,
	site: AssetSite,
	script_path: String,
	asset_dir: String,
	shared: Arc<LoaderShared>,
}

impl ModuleLoader {

	/// Creates a loader serving assets from `site`.
	///
	/// The engine is yours to configure; the loader only compiles and instantiates with it.
	pub fn new( engine: Engine, site: AssetSite ) -> Self {
		Self {
			engine,
			site,
			script_path: DEFAULT_SCRIPT_PATH.to_string(),
			asset_dir: DEFAULT_ASSET_DIR.to_string(),
			shared: Arc::new( LoaderShared {
				state: Mutex::new( LoaderState::default() ),
				phase: watch::Sender::new( LoaderPhase::Idle ),
			}),
		}
	}

	/// Sets the URL path the loader script is fetched from.
	pub fn with_script_path( mut self, script_path: impl Into<String> ) -> Self {
		self.script_path = script_path.into();
		self
	}

	/// Sets the directory hosts route binary and data assets to.
	pub fn with_asset_dir( mut self, asset_dir: impl Into<String> ) -> Self {
		self.asset_dir = asset_dir.into();
		self
	}

	#[inline] pub fn script_path( &self ) -> &str { &self.script_path }
	#[inline] pub fn asset_dir( &self ) -> &str { &self.asset_dir }

	/// The current protocol phase.
	pub fn phase( &self ) -> LoaderPhase { self.shared.phase.borrow().clone() }

	/// How many times the loader script has been injected. Never exceeds one.
	pub fn injection_count( &self ) -> usize {
		self.shared.state.lock().map_or( 0, | state | state.injections )
	}

	/// Registers the configuration the runtime consults when it initializes.
	///
	/// The runtime takes the configuration registered at the moment it starts initializing;
	/// registering again before then replaces it.
	pub fn register_runtime( &self, config: RuntimeConfig ) {
		match self.shared.state.lock() {
			Ok( mut state ) => { state.registered = Some( config ); }
			Err( _ ) => tracing::warn!( "loader state poisoned; runtime configuration dropped" ),
		}
	}

	/// Waits until the loader reaches a terminal phase and returns it.
	///
	/// If no load was ever requested this waits until one is requested and settles.
	pub async fn settled( &self ) -> LoaderPhase {
		let mut phase = self.shared.phase.subscribe();
		let settled = match phase.wait_for( LoaderPhase::is_terminal ).await {
			Ok( settled ) => settled.clone(),
			// The sender lives as long as `self`.
			Err( _ ) => LoaderPhase::Idle,
		};
		settled
	}

	/// Acquires the module, resolving exactly once to a ready handle or a failure.
	///
	/// The first call injects the loader script and starts the runtime; the work continues
	/// in a spawned task even if this future is dropped. Later calls never re-inject: they
	/// return the ready handle straight away, or wait for the in-flight acquisition to settle.
	///
	/// Must be called from within a Tokio runtime.
	///
	/// # Errors
	/// [`LoadError::ScriptLoad`] if the loader script could not be fetched or executed,
	/// [`LoadError::RuntimeAbort`] if the runtime aborted during initialization.
	pub async fn load( &self, config: RuntimeConfig ) -> Result<ModuleHandle, LoadError> {

		self.register_runtime( config );
		let mut phase = self.shared.phase.subscribe();

		if self.claim_injection()? {
			tracing::info!( script = %self.script_path, "injecting loader script" );
			self.shared.phase.send_replace( LoaderPhase::FetchingCode );
			tokio::spawn( bootstrap( self.clone() ));
		} else {
			let ready = match &*phase.borrow_and_update() {
				LoaderPhase::Ready( handle ) => Some( handle.clone() ),
				_ => None,
			};
			if let Some( handle ) = ready {
				tracing::debug!( "loader script already injected and runtime ready" );
				return Ok( handle );
			}
			tracing::debug!( "loader script already injected; waiting for runtime" );
		}

		let outcome = match phase.wait_for( LoaderPhase::is_terminal ).await {
			Ok( settled ) => settled.outcome(),
			Err( _ ) => None,
		};
		outcome.unwrap_or_else(|| Err( LoadError::RuntimeAbort { what: "loader dropped before settling".to_string() }))

	}

	fn claim_injection( &self ) -> Result<bool, LoadError> {
		let mut state = self.shared.state.lock().map_err(|_| LoadError::ScriptLoad {
			path: self.script_path.clone(),
			reason: "loader state poisoned".to_string(),
		})?;
		if state.script_injected { return Ok( false ) }
		state.script_injected = true ;
		state.injections += 1 ;
		Ok( true )
	}

}

impl std::fmt::Debug for ModuleLoader {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ModuleLoader" )
			.field( "site", &self.site )
			.field( "script_path", &self.script_path )
			.field( "asset_dir", &self.asset_dir )
			.field( "phase", &self.phase() )
			.finish_non_exhaustive()
	}
}

#[tracing::instrument( skip( loader ), fields( script = %loader.script_path ))]
async fn bootstrap( loader: ModuleLoader ) {

	let shared = &loader.shared ;

	let script = match fetch_script( &loader ).await {
		Ok( script ) => script,
		Err( reason ) => {
			tracing::warn!( %reason, "loader script failed to load" );
			shared.phase.send_replace( LoaderPhase::Aborted( LoadError::ScriptLoad {
				path: loader.script_path.clone(),
				reason,
			}));
			return ;
		}
	};

	shared.phase.send_replace( LoaderPhase::InitializingRuntime );
	tracing::debug!( binary = %script.binary, data = ?script.data, "initializing runtime" );

	let config = shared.state.lock().ok().and_then(| mut state | state.registered.take() );
	let Some( config ) = config else {
		tracing::warn!( "no runtime configuration registered" );
		shared.phase.send_replace( LoaderPhase::Aborted( LoadError::RuntimeAbort {
			what: "no runtime configuration registered".to_string(),
		}));
		return ;
	};

	let directory = script::script_directory( &loader.script_path );
	let phase = match runtime::initialise( &loader.engine, &loader.site, &script, directory, config ).await {
		Ok( handle ) => {
			tracing::debug!( "runtime initialized" );
			LoaderPhase::Ready( handle )
		}
		Err( what ) => {
			tracing::warn!( %what, "runtime aborted" );
			LoaderPhase::Aborted( LoadError::RuntimeAbort { what })
		}
	};
	shared.phase.send_replace( phase );

}

async fn fetch_script( loader: &ModuleLoader ) -> Result<LoaderScript, String> {
	let bytes = loader.site.fetch( &loader.script_path ).await.map_err(| err | err.to_string() )?;
	LoaderScript::parse( bytes ).map_err(| err | err.to_string() )
}
