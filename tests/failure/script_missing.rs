use wasm_canvas::{ HostStatus, HostSurface, LoadError, RuntimeConfig, SessionStatus, SurfaceHandle };
use crate::test_utils::{ loader, within, Counter };

#[tokio::test]
async fn unreachable_script_fails_the_host() {

	let loader = loader( site_path!( "ready" )).with_script_path( "/wasm/absent.toml" );
	let mut host = HostSurface::default();
	host.surface_available( &loader );

	match within( host.settled() ).await {
		HostStatus::Error( LoadError::ScriptLoad { path, reason }) => {
			assert_eq!( path, "/wasm/absent.toml" );
			assert_eq!( reason, "Not Found: /wasm/absent.toml" );
		}
		other => panic!( "Expected a script load error, got: {:#?}", other ),
	}
	assert!( matches!( host.session_status(), SessionStatus::Failed( _ )));

	assert!( !host.surface_available( &loader ));
	for _ in 0..10 { tokio::task::yield_now().await ; }
	assert!( matches!( host.status(), HostStatus::Error( LoadError::ScriptLoad { .. })));

}

#[tokio::test]
async fn script_failure_never_reaches_the_runtime_callbacks() {

	let loader = loader( site_path!( "ready" )).with_script_path( "/wasm/absent.toml" );
	let surface = SurfaceHandle::default();
	let initialized = Counter::default();
	let aborted = Counter::default();

	let config = RuntimeConfig::new( surface.downgrade() )
		.on_runtime_initialized({ let initialized = initialized.clone(); move || initialized.bump() })
		.on_abort({ let aborted = aborted.clone(); move | _ | aborted.bump() });

	match within( loader.load( config )).await {
		Err( LoadError::ScriptLoad { .. }) => {}
		other => panic!( "Expected a script load error, got: {:#?}", other ),
	}
	assert_eq!( initialized.get(), 0 );
	assert_eq!( aborted.get(), 0 );

}

#[tokio::test]
async fn later_mounts_see_the_same_failure_without_reinjecting() {

	let loader = loader( site_path!( "ready" )).with_script_path( "/wasm/absent.toml" );

	let mut first = HostSurface::default();
	first.surface_available( &loader );
	let first_status = within( first.settled() ).await ;
	assert!( matches!( first_status, HostStatus::Error( LoadError::ScriptLoad { .. })));

	let mut second = HostSurface::default();
	second.surface_available( &loader );
	assert_eq!( within( second.settled() ).await, first_status );
	assert_eq!( loader.injection_count(), 1 );

}
