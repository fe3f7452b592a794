use std::time::Duration ;
use wasm_canvas::{ HostStatus, HostSurface, LoaderPhase, Surface, FRAME_INTERVAL };
use crate::test_utils::{ loader, until, within, Lines };

#[tokio::test]
async fn ready_host_keeps_presenting_frames() {

	let loader = loader( site_path!( "ready" ));
	let mut host = HostSurface::default();
	host.surface_available( &loader );
	assert_eq!( within( host.settled() ).await, HostStatus::Ready );

	let frames = || host.surface().with( Surface::frames_presented ).unwrap();
	until(|| frames() > 0 ).await ;
	let after_main = frames();
	until(|| frames() > after_main ).await ;
	assert_eq!( host.surface().snapshot().unwrap().pixel( 0, 0 ), Some([ 30, 30, 46, 255 ]));

	// Clicks land between ticks and show up without an explicit frame.
	host.module().unwrap().pointer_down( 100, 220 ).unwrap();
	until(|| host.surface().with(| surface | surface.pixel( 150, 150 )).unwrap() == Some([ 166, 227, 161, 255 ])).await ;

}

#[tokio::test]
async fn main_runs_once_across_hosts() {

	let loader = loader( site_path!( "custom_layout" ))
		.with_script_path( "/boot/loader.toml" )
		.with_asset_dir( "/assets" );

	let mut first = HostSurface::default();
	first.surface_available( &loader );
	assert_eq!( within( first.settled() ).await, HostStatus::Ready );

	let mut second = HostSurface::default();
	second.surface_available( &loader );
	assert_eq!( within( second.settled() ).await, HostStatus::Ready );

	let module = second.module().unwrap();
	assert_eq!( module.start().unwrap(), None );
	assert_eq!( module.run_main().unwrap(), 7 );

}

#[tokio::test]
async fn explicit_start_returns_the_exit_code_once() {

	let loader = loader( site_path!( "custom_layout" )).with_script_path( "/boot/loader.toml" );
	let surface = wasm_canvas::SurfaceHandle::default();
	let stdout = Lines::default();
	let config = wasm_canvas::RuntimeConfig::new( surface.downgrade() )
		.with_asset_dir( "/assets" )
		.with_print( stdout.sink() );
	let module = within( loader.load( config )).await.unwrap();

	assert_eq!( module.start().unwrap(), Some( 7 ));
	assert_eq!( module.start().unwrap(), None );
	assert_eq!( stdout.get(), vec![ "stdout line".to_string() ]);

}

#[tokio::test]
async fn main_loop_stops_with_the_surface() {

	let loader = loader( site_path!( "ready" ));
	let mut host = HostSurface::default();
	host.surface_available( &loader );
	assert_eq!( within( host.settled() ).await, HostStatus::Ready );
	assert!( matches!( loader.phase(), LoaderPhase::Ready( _ )));

	let task = host.unmount().expect( "a started host has a task" );
	tokio::time::sleep( FRAME_INTERVAL + Duration::from_millis( 5 )).await ;
	within( task ).await.unwrap();

}
