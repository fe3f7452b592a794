use wasm_canvas::{ LoadSession, SessionStatus, SurfaceHandle, TransitionError };

#[test]
fn session_moves_forward_to_ready() {
	let surface = SurfaceHandle::default();
	let mut session = LoadSession::new();
	assert_eq!( session.status(), &SessionStatus::Idle );
	assert!( session.surface().is_none() );

	session.begin( surface.downgrade() ).unwrap();
	assert_eq!( session.status(), &SessionStatus::Acquiring );
	assert!( session.surface().is_some_and(| surface | surface.is_alive() ));

	session.complete().unwrap();
	assert_eq!( session.status(), &SessionStatus::Ready );
	assert!( session.status().is_terminal() );
	assert_eq!( session.error_message(), None );
}

#[test]
fn failure_carries_its_message() {
	let mut session = LoadSession::new();
	session.begin( SurfaceHandle::default().downgrade() ).unwrap();
	session.fail( "Module aborted: boom" ).unwrap();
	assert_eq!( session.error_message(), Some( "Module aborted: boom" ));
	assert_eq!( session.status().to_string(), "failed: Module aborted: boom" );
}

#[test]
fn completion_after_failure_is_rejected() {
	let mut session = LoadSession::new();
	session.begin( SurfaceHandle::default().downgrade() ).unwrap();
	session.fail( "boom" ).unwrap();

	assert_eq!( session.complete(), Err( TransitionError {
		from: SessionStatus::Failed( "boom".to_string() ),
		to: SessionStatus::Ready,
	}));
	assert_eq!( session.error_message(), Some( "boom" ));
}

#[test]
fn sessions_begin_only_once() {
	let surface = SurfaceHandle::default();
	let mut session = LoadSession::new();
	session.begin( surface.downgrade() ).unwrap();
	let error = session.begin( surface.downgrade() ).unwrap_err();
	assert_eq!( error.to_string(), "Invalid Transition: acquiring -> acquiring" );

	session.complete().unwrap();
	assert!( session.fail( "late" ).is_err() );
	assert!( session.complete().is_err() );
	assert_eq!( session.status(), &SessionStatus::Ready );
}

#[test]
fn idle_sessions_cannot_settle() {
	let mut session = LoadSession::new();
	assert!( session.complete().is_err() );
	assert!( session.fail( "early" ).is_err() );
	assert_eq!( session.status(), &SessionStatus::Idle );
}
