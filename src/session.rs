//! Load session state machine.
//!
//! A [`LoadSession`] is one attempt to acquire and initialize a module for a given
//! surface. It only ever moves forward: `Idle → Acquiring → { Ready | Failed }`.

use thiserror::Error ;

use crate::surface::WeakSurface ;

/// Where a [`LoadSession`] currently is.
#[derive( Debug, Clone, PartialEq, Eq, Default )]
pub enum SessionStatus {
	/// Created, acquisition not started.
	#[default] Idle,
	/// The loader is working on it.
	Acquiring,
	/// The module is initialized and callable.
	Ready,
	/// Acquisition failed; carries the diagnostic.
	Failed( String ),
}

impl SessionStatus {
	/// Whether no further transitions can happen.
	pub fn is_terminal( &self ) -> bool { matches!( self, Self::Ready | Self::Failed( _ )) }
}

impl std::fmt::Display for SessionStatus {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result {
		match self {
			Self::Idle => write!( f, "idle" ),
			Self::Acquiring => write!( f, "acquiring" ),
			Self::Ready => write!( f, "ready" ),
			Self::Failed( message ) => write!( f, "failed: {}", message ),
		}
	}
}

/// A transition the session state machine does not allow.
#[derive( Error, Debug, Clone, PartialEq, Eq )]
#[error( "Invalid Transition: {from} -> {to}" )]
pub struct TransitionError {
	pub from: SessionStatus,
	pub to: SessionStatus,
}

/// One attempt to acquire and initialize the module for a surface.
#[derive( Debug, Default )]
pub struct LoadSession {
	status: SessionStatus,
	surface: Option<WeakSurface>,
}

impl LoadSession {

	pub fn new() -> Self { Self::default() }

	#[inline] pub fn status( &self ) -> &SessionStatus { &self.status }

	/// The surface supplied when acquisition began.
	#[inline] pub fn surface( &self ) -> Option<&WeakSurface> { self.surface.as_ref() }

	/// The failure diagnostic; present only once the session has failed.
	pub fn error_message( &self ) -> Option<&str> {
		match &self.status {
			SessionStatus::Failed( message ) => Some( message ),
			_ => None,
		}
	}

	/// `Idle → Acquiring`, binding the session to `surface`.
	///
	/// # Errors
	/// Fails unless the session is idle.
	pub fn begin( &mut self, surface: WeakSurface ) -> Result<(), TransitionError> {
		self.transition( SessionStatus::Acquiring )?;
		self.surface = Some( surface );
		Ok(())
	}

	/// `Acquiring → Ready`.
	///
	/// # Errors
	/// Fails unless the session is acquiring; a completion after a failure is rejected.
	pub fn complete( &mut self ) -> Result<(), TransitionError> {
		self.transition( SessionStatus::Ready )
	}

	/// `Acquiring → Failed( message )`.
	///
	/// # Errors
	/// Fails unless the session is acquiring.
	pub fn fail( &mut self, message: impl Into<String> ) -> Result<(), TransitionError> {
		self.transition( SessionStatus::Failed( message.into() ))
	}

	fn transition( &mut self, to: SessionStatus ) -> Result<(), TransitionError> {
		let allowed = matches!(
			( &self.status, &to ),
			( SessionStatus::Idle, SessionStatus::Acquiring )
			| ( SessionStatus::Acquiring, SessionStatus::Ready )
			| ( SessionStatus::Acquiring, SessionStatus::Failed( _ ))
		);
		match allowed {
			true => { self.status = to ; Ok(()) }
			false => Err( TransitionError { from: self.status.clone(), to }),
		}
	}

}
