use wasm_canvas::{ HostSurface, LoadError, LoaderPhase };
use crate::test_utils::{ loader, within };

#[tokio::test]
async fn late_completion_after_teardown_is_ignored() {

	let loader = loader( site_path!( "ready" ));
	let mut host = HostSurface::default();
	let surface = host.surface().downgrade();

	assert!( host.surface_available( &loader ));
	let task = host.unmount().expect( "a started host has a task" );
	assert!( !surface.is_alive() );

	let module = match within( loader.settled() ).await {
		LoaderPhase::Ready( module ) => module,
		other => panic!( "Expected the runtime to finish initializing, got: {:#?}", other ),
	};
	within( task ).await.expect( "host task finished cleanly" );

	// The module keeps running; its frames have nowhere to go.
	assert_eq!( module.run_main().unwrap(), 0 );
	module.frame().unwrap();
	assert_eq!( surface.dimensions(), None );
	assert!( !surface.present( &[ 0 ; 4 ]).unwrap() );

}

#[tokio::test]
async fn late_abort_after_teardown_is_ignored() {

	let loader = loader( site_path!( "guest_abort" ));
	let mut host = HostSurface::default();

	assert!( host.surface_available( &loader ));
	let task = host.unmount().expect( "a started host has a task" );

	match within( loader.settled() ).await {
		LoaderPhase::Aborted( LoadError::RuntimeAbort { what }) => assert_eq!( what, "Failed to load font!" ),
		other => panic!( "Expected the runtime to abort, got: {:#?}", other ),
	}
	within( task ).await.expect( "host task finished cleanly" );

}
