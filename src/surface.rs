//! The drawable surface a module renders into.
//!
//! A [`SurfaceHandle`] is the host's owning reference to a fixed-size RGBA framebuffer.
//! The module side only ever sees a [`WeakSurface`], so once the host drops its handle
//! every later frame the module presents is silently discarded.

use std::sync::{ Arc, Mutex, Weak };
use thiserror::Error ;

/// Logical width of the surface when none is specified.
pub const DEFAULT_WIDTH: u32 = 300 ;
/// Logical height of the surface when none is specified.
pub const DEFAULT_HEIGHT: u32 = 300 ;

const BYTES_PER_PIXEL: usize = 4 ;

/// Errors that can occur when a module presents a frame.
#[derive( Error, Debug, Clone, PartialEq, Eq )]
pub enum SurfaceError {
	/// Failed to acquire lock on the surface (another presenter panicked mid-frame).
	#[error( "Lock Rejected" )] LockRejected,
	/// The presented frame does not cover the surface exactly.
	#[error( "Frame Size Mismatch: expected {expected} bytes, got {actual}" )]
	FrameSizeMismatch { expected: usize, actual: usize },
}

/// An RGBA8 framebuffer of fixed dimensions.
#[derive( Clone, PartialEq, Eq )]
pub struct Surface {
	width: u32,
	height: u32,
	pixels: Vec<u8>,
	frames_presented: u64,
}

impl Surface {

	fn new( width: u32, height: u32 ) -> Self {
		Self {
			width,
			height,
			pixels: vec![ 0 ; width as usize * height as usize * BYTES_PER_PIXEL ],
			frames_presented: 0,
		}
	}

	fn frame_len( &self ) -> usize { self.pixels.len() }

	fn present( &mut self, rgba: &[u8] ) -> Result<(), SurfaceError> {
		if rgba.len() != self.frame_len() {
			return Err( SurfaceError::FrameSizeMismatch { expected: self.frame_len(), actual: rgba.len() });
		}
		self.pixels.copy_from_slice( rgba );
		self.frames_presented += 1 ;
		Ok(())
	}

	#[inline] pub fn width( &self ) -> u32 { self.width }
	#[inline] pub fn height( &self ) -> u32 { self.height }

	/// Raw RGBA8 bytes, row-major.
	#[inline] pub fn pixels( &self ) -> &[u8] { &self.pixels }

	/// Number of frames the module has presented so far.
	#[inline] pub fn frames_presented( &self ) -> u64 { self.frames_presented }

	/// The RGBA value at `( x, y )`, if inside the surface.
	pub fn pixel( &self, x: u32, y: u32 ) -> Option<[u8; 4]> {
		if x >= self.width || y >= self.height { return None }
		let offset = ( y as usize * self.width as usize + x as usize ) * BYTES_PER_PIXEL ;
		self.pixels.get( offset..offset + BYTES_PER_PIXEL )?.try_into().ok()
	}

}

impl std::fmt::Debug for Surface {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "Surface" )
			.field( "width", &self.width )
			.field( "height", &self.height )
			.field( "pixels", &"<framebuffer>" )
			.field( "frames_presented", &self.frames_presented )
			.finish()
	}
}

/// Owning handle to a [`Surface`], held by the host.
///
/// Cloning the handle yields another reference to the same framebuffer.
#[derive( Debug, Clone )]
pub struct SurfaceHandle( Arc<Mutex<Surface>> );

impl SurfaceHandle {

	/// Creates a cleared surface of the given size.
	pub fn new( width: u32, height: u32 ) -> Self {
		Self( Arc::new( Mutex::new( Surface::new( width, height ))))
	}

	/// A non-owning reference suitable for handing to the module runtime.
	pub fn downgrade( &self ) -> WeakSurface { WeakSurface( Arc::downgrade( &self.0 )) }

	/// Runs `read` against the current framebuffer contents.
	///
	/// # Errors
	/// Returns [`SurfaceError::LockRejected`] if the surface lock is poisoned.
	pub fn with<R>( &self, read: impl FnOnce( &Surface ) -> R ) -> Result<R, SurfaceError> {
		let lock = self.0.lock().map_err(|_| SurfaceError::LockRejected )?;
		Ok( read( &lock ))
	}

	/// A copy of the current framebuffer.
	///
	/// # Errors
	/// Returns [`SurfaceError::LockRejected`] if the surface lock is poisoned.
	pub fn snapshot( &self ) -> Result<Surface, SurfaceError> { self.with( Surface::clone ) }

}

impl Default for SurfaceHandle {
	fn default() -> Self { Self::new( DEFAULT_WIDTH, DEFAULT_HEIGHT ) }
}

/// Non-owning reference to a [`Surface`].
///
/// All operations degrade to no-ops once the owning [`SurfaceHandle`] is gone.
#[derive( Debug, Clone, Default )]
pub struct WeakSurface( Weak<Mutex<Surface>> );

impl WeakSurface {

	/// Whether the host still owns the surface.
	pub fn is_alive( &self ) -> bool { self.0.strong_count() > 0 }

	/// `( width, height )` of the surface, or `None` once torn down.
	pub fn dimensions( &self ) -> Option<( u32, u32 )> {
		let surface = self.0.upgrade()?;
		let lock = surface.lock().ok()?;
		Some(( lock.width, lock.height ))
	}

	/// Copies a full RGBA frame onto the surface.
	///
	/// Returns `Ok( false )` without touching anything if the surface was torn down.
	///
	/// # Errors
	/// Returns an error if the frame size is wrong or the lock is poisoned.
	pub fn present( &self, rgba: &[u8] ) -> Result<bool, SurfaceError> {
		let Some( surface ) = self.0.upgrade() else { return Ok( false )};
		let mut lock = surface.lock().map_err(|_| SurfaceError::LockRejected )?;
		lock.present( rgba )?;
		Ok( true )
	}

}
