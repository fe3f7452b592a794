use wasm_canvas::{ HostStatus, HostSurface, LoadError, SessionStatus };
use crate::test_utils::{ loader, within };

#[tokio::test]
async fn module_abort_message_reaches_the_host() {

	let loader = loader( site_path!( "guest_abort" ));
	let mut host = HostSurface::default();
	host.surface_available( &loader );

	let status = within( host.settled() ).await ;
	assert_eq!( status, HostStatus::Error( LoadError::RuntimeAbort { what: "Failed to load font!".to_string() }));
	assert_eq!( status.to_string(), "Module aborted: Failed to load font!" );
	assert_eq!( host.session_status(), SessionStatus::Failed( "Module aborted: Failed to load font!".to_string() ));

	for _ in 0..10 { tokio::task::yield_now().await ; }
	assert_eq!( host.status(), status );
	assert!( host.module().is_none() );

}
