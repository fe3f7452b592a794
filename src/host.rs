//! The host side: a drawable surface plus the status shown next to it.

use std::sync::{ Arc, Mutex, Weak };
use std::time::Duration ;
use tokio::sync::watch ;
use tokio::task::JoinHandle ;
use tokio::time::MissedTickBehavior ;

use crate::config::RuntimeConfig ;
use crate::loader::{ LoadError, ModuleLoader };
use crate::runtime::{ InvocationError, ModuleHandle };
use crate::session::{ LoadSession, SessionStatus };
use crate::surface::{ SurfaceHandle, WeakSurface };

/// Time between two main-loop ticks of a module running against a host surface.
pub const FRAME_INTERVAL: Duration = Duration::from_millis( 16 );

/// What the host shows its user.
#[derive( Debug, Clone, PartialEq, Eq, Default )]
pub enum HostStatus {
	/// The module is being acquired.
	#[default] Loading,
	/// The module is running against the surface.
	Ready,
	/// Acquisition failed; the host stays here for good.
	Error( LoadError ),
}

impl HostStatus {
	pub fn is_settled( &self ) -> bool { !matches!( self, Self::Loading ) }
}

impl std::fmt::Display for HostStatus {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result {
		match self {
			Self::Loading => write!( f, "Initializing SDL..." ),
			Self::Ready => write!( f, "Ready" ),
			Self::Error( error ) => write!( f, "{}", error ),
		}
	}
}

struct HostShared {
	session: Mutex<LoadSession>,
	status: watch::Sender<HostStatus>,
	module: Mutex<Option<ModuleHandle>>,
}

impl HostShared {

	/// Applies the load outcome; yields the module when the session became ready.
	fn settle( &self, outcome: Result<ModuleHandle, LoadError> ) -> Option<ModuleHandle> {
		let Ok( mut session ) = self.session.lock() else {
			tracing::warn!( "host session poisoned; load outcome dropped" );
			return None ;
		};
		let transition = match &outcome {
			Ok( _ ) => session.complete(),
			Err( error ) => session.fail( error.to_string() ),
		};
		if let Err( error ) = transition {
			tracing::debug!( %error, "ignoring load outcome for a settled session" );
			return None ;
		}
		match outcome {
			Ok( handle ) => {
				if let Ok( mut module ) = self.module.lock() { *module = Some( handle.clone() ); }
				self.status.send_replace( HostStatus::Ready );
				Some( handle )
			}
			Err( error ) => {
				tracing::warn!( %error, "module failed to load" );
				self.status.send_replace( HostStatus::Error( error ));
				None
			}
		}
	}

}

/// Owns a drawable surface and drives one load session for it.
///
/// Once the module is ready the host runs its `main` and then ticks its `frame` export
/// every [`FRAME_INTERVAL`] for as long as the surface exists.
///
/// Dropping the host abandons any pending acquisition: the outcome, when it arrives,
/// finds nothing to update and is discarded.
pub struct HostSurface {
	surface: SurfaceHandle,
	shared: Arc<HostShared>,
	task: Option<JoinHandle<()>>,
}

impl HostSurface {

	/// Creates a host with a cleared `width` × `height` surface and no session.
	pub fn new( width: u32, height: u32 ) -> Self {
		Self::with_surface( SurfaceHandle::new( width, height ))
	}

	pub fn with_surface( surface: SurfaceHandle ) -> Self {
		Self {
			surface,
			shared: Arc::new( HostShared {
				session: Mutex::new( LoadSession::new() ),
				status: watch::Sender::new( HostStatus::Loading ),
				module: Mutex::new( None ),
			}),
			task: None,
		}
	}

	/// Signals that the surface is ready to be drawn into.
	///
	/// Starts a load session through `loader` if none exists yet and returns `true`.
	/// While a session exists, repeated calls do nothing and return `false`.
	///
	/// Outside a Tokio runtime nothing can be spawned, so no session is started and this
	/// returns `false`. The runtime needs its time driver for the main loop.
	pub fn surface_available( &mut self, loader: &ModuleLoader ) -> bool {

		let Ok( runtime ) = tokio::runtime::Handle::try_current() else {
			tracing::warn!( "surface available outside a Tokio runtime; not loading" );
			return false ;
		};

		{
			let Ok( mut session ) = self.shared.session.lock() else { return false };
			if let Err( error ) = session.begin( self.surface.downgrade() ) {
				tracing::debug!( %error, "load session already exists" );
				return false ;
			}
		}

		let config = RuntimeConfig::new( self.surface.downgrade() )
			.with_asset_dir( loader.asset_dir() )
			.with_print(| text | tracing::info!( target: "module::stdout", "SDL Output: {}", text ))
			.with_print_err(| text | tracing::error!( target: "module::stderr", "SDL Error: {}", text ));

		let host: Weak<HostShared> = Arc::downgrade( &self.shared );
		let surface = self.surface.downgrade();
		let loader = loader.clone();
		self.task = Some( runtime.spawn( async move {
			let outcome = loader.load( config ).await ;
			let module = match host.upgrade() {
				Some( host ) => host.settle( outcome ),
				None => {
					tracing::debug!( "host torn down before the load settled" );
					None
				}
			};
			if let Some( module ) = module { drive( module, surface ).await }
		}));

		true

	}

	/// The current visible status.
	pub fn status( &self ) -> HostStatus { self.shared.status.borrow().clone() }

	/// Waits until the status leaves [`HostStatus::Loading`] and returns it.
	pub async fn settled( &self ) -> HostStatus {
		let mut status = self.shared.status.subscribe();
		let settled = match status.wait_for( HostStatus::is_settled ).await {
			Ok( settled ) => settled.clone(),
			Err( _ ) => HostStatus::Loading,
		};
		settled
	}

	/// State of this host's load session.
	pub fn session_status( &self ) -> SessionStatus {
		self.shared.session.lock().map_or( SessionStatus::Idle, | session | session.status().clone() )
	}

	/// The ready module, once acquired.
	pub fn module( &self ) -> Option<ModuleHandle> {
		self.shared.module.lock().ok().and_then(| module | module.clone() )
	}

	/// The host's owning surface handle.
	pub fn surface( &self ) -> &SurfaceHandle { &self.surface }

	/// Tears the host down, releasing the surface.
	///
	/// Returns the host's background task, if a session was started. It finishes once a
	/// pending load settles or, for a running module, at the next main-loop tick.
	pub fn unmount( mut self ) -> Option<JoinHandle<()>> {
		tracing::debug!( status = %self.status(), "unmounting host surface" );
		self.task.take()
	}

}

impl Default for HostSurface {
	fn default() -> Self { Self::with_surface( SurfaceHandle::default() ) }
}

impl std::fmt::Debug for HostSurface {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "HostSurface" )
			.field( "surface", &self.surface )
			.field( "status", &self.status() )
			.field( "session", &self.session_status() )
			.finish_non_exhaustive()
	}
}

async fn drive( module: ModuleHandle, surface: WeakSurface ) {

	match module.start() {
		Ok( Some( code )) => tracing::debug!( code, "module main returned" ),
		Ok( None ) => {}
		Err( error ) => {
			tracing::warn!( %error, "module main failed" );
			return ;
		}
	}

	let mut ticks = tokio::time::interval( FRAME_INTERVAL );
	ticks.set_missed_tick_behavior( MissedTickBehavior::Skip );
	loop {
		ticks.tick().await ;
		if !surface.is_alive() {
			tracing::debug!( "surface torn down; main loop stopped" );
			return ;
		}
		match module.frame() {
			Ok(()) => {}
			Err( InvocationError::MissingExport( _ )) => {
				tracing::debug!( "module has no main loop" );
				return ;
			}
			Err( error ) => {
				tracing::warn!( %error, "module main loop failed" );
				return ;
			}
		}
	}

}
