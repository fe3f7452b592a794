use std::sync::{ Arc, Mutex };
use wasm_canvas::{ LoadError, RuntimeConfig, SurfaceHandle };
use crate::test_utils::{ loader, within, Counter, Lines };

#[tokio::test]
async fn abort_fires_once_and_completion_never() {

	let loader = loader( site_path!( "guest_abort" ));
	let surface = SurfaceHandle::default();
	let stderr = Lines::default();
	let initialized = Counter::default();
	let reasons = Arc::new( Mutex::new( Vec::new() ));

	let config = RuntimeConfig::new( surface.downgrade() )
		.with_print_err( stderr.sink() )
		.on_runtime_initialized({ let initialized = initialized.clone(); move || initialized.bump() })
		.on_abort({ let reasons = Arc::clone( &reasons ); move | what: &str | reasons.lock().unwrap().push( what.to_string() ) });

	let outcome = within( loader.load( config )).await ;
	assert_eq!( outcome.unwrap_err(), LoadError::RuntimeAbort { what: "Failed to load font!".to_string() });

	assert_eq!( *reasons.lock().unwrap(), vec![ "Failed to load font!".to_string() ]);
	assert_eq!( initialized.get(), 0 );
	assert!( stderr.get().contains( &"Aborted(Failed to load font!)".to_string() ));

	// A later load resolves from the sticky outcome without touching the new callbacks.
	let late = Counter::default();
	let config = RuntimeConfig::new( surface.downgrade() )
		.on_abort({ let late = late.clone(); move | _ | late.bump() });
	assert!( within( loader.load( config )).await.is_err() );
	assert_eq!( late.get(), 0 );
	assert_eq!( reasons.lock().unwrap().len(), 1 );

}
