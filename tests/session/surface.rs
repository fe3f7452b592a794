use wasm_canvas::{ SurfaceError, SurfaceHandle, DEFAULT_HEIGHT, DEFAULT_WIDTH };

#[test]
fn default_surface_is_cleared() {
	let surface = SurfaceHandle::default().snapshot().unwrap();
	assert_eq!(( surface.width(), surface.height() ), ( DEFAULT_WIDTH, DEFAULT_HEIGHT ));
	assert_eq!( surface.pixels().len(), 300 * 300 * 4 );
	assert_eq!( surface.pixel( 0, 0 ), Some([ 0, 0, 0, 0 ]));
	assert_eq!( surface.pixel( 299, 300 ), None );
	assert_eq!( surface.frames_presented(), 0 );
}

#[test]
fn presented_frames_must_cover_the_surface() {
	let handle = SurfaceHandle::new( 2, 2 );
	let weak = handle.downgrade();
	assert_eq!( weak.dimensions(), Some(( 2, 2 )));

	assert_eq!( weak.present( &[ 0 ; 4 ]), Err( SurfaceError::FrameSizeMismatch { expected: 16, actual: 4 }));

	let frame: Vec<u8> = ( 0..16 ).collect();
	assert_eq!( weak.present( &frame ), Ok( true ));
	let surface = handle.snapshot().unwrap();
	assert_eq!( surface.frames_presented(), 1 );
	assert_eq!( surface.pixel( 1, 1 ), Some([ 12, 13, 14, 15 ]));
}

#[test]
fn torn_down_surfaces_ignore_frames() {
	let handle = SurfaceHandle::new( 1, 1 );
	let weak = handle.downgrade();
	drop( handle );
	assert!( !weak.is_alive() );
	assert_eq!( weak.dimensions(), None );
	assert_eq!( weak.present( &[ 1, 2, 3, 4 ]), Ok( false ));
}
