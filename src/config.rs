//! The configuration object a module runtime consults while it initializes.
//!
//! A [`RuntimeConfig`] is handed to [`ModuleLoader::register_runtime`]( crate::ModuleLoader::register_runtime )
//! (or [`ModuleLoader::load`]( crate::ModuleLoader::load ), which registers it for you). It names the
//! surface to render into, decides where auxiliary assets are fetched from, receives the
//! module's text output, and is told once whether initialization completed or aborted.

use std::sync::Arc ;

use crate::surface::WeakSurface ;

/// Directory binary and data assets are served from unless configured otherwise.
pub const DEFAULT_ASSET_DIR: &str = "/wasm/" ;

/// Maps a requested asset name and the loader script's directory to a URL path.
pub type LocateFile = Arc<dyn Fn( &str, &str ) -> String + Send + Sync>;

/// Receives one line of free-form diagnostic text from the module.
pub type OutputSink = Arc<dyn Fn( &str ) + Send + Sync>;

pub(crate) type CompletionCallback = Box<dyn FnOnce() + Send>;
pub(crate) type AbortCallback = Box<dyn FnOnce( &str ) + Send>;

/// Builds the default asset routing function.
///
/// Names ending in `.wasm` or `.data` resolve inside `asset_dir`; everything else resolves
/// relative to the directory the loader script was fetched from.
///
/// ```
/// let locate = wasm_canvas::default_locate_file( "/wasm/" );
/// assert_eq!( locate( "simple.wasm", "/scripts/" ), "/wasm/simple.wasm" );
/// assert_eq!( locate( "simple.data", "/scripts/" ), "/wasm/simple.data" );
/// assert_eq!( locate( "font.ttf", "/scripts/" ), "/scripts/font.ttf" );
/// ```
pub fn default_locate_file( asset_dir: impl Into<String> ) -> LocateFile {
	let mut asset_dir = asset_dir.into();
	if !asset_dir.ends_with( '/' ) { asset_dir.push( '/' ); }
	Arc::new( move | path: &str, script_directory: &str | {
		match path.ends_with( ".wasm" ) || path.ends_with( ".data" ) {
			true => format!( "{}{}", asset_dir, path ),
			false => format!( "{}{}", script_directory, path ),
		}
	})
}

/// The configuration a module runtime is initialized with.
///
/// Output sinks default to `tracing` events under the `module::stdout` and
/// `module::stderr` targets. The completion and abort callbacks default to nothing.
#[must_use = "pass the config to ModuleLoader::load or ModuleLoader::register_runtime"]
pub struct RuntimeConfig {
	pub(crate) surface: WeakSurface,
	pub(crate) locate_file: LocateFile,
	pub(crate) print: OutputSink,
	pub(crate) print_err: OutputSink,
	pub(crate) on_runtime_initialized: Option<CompletionCallback>,
	pub(crate) on_abort: Option<AbortCallback>,
}

impl RuntimeConfig {

	/// Creates a configuration bound to `surface`.
	pub fn new( surface: WeakSurface ) -> Self {
		Self {
			surface,
			locate_file: default_locate_file( DEFAULT_ASSET_DIR ),
			print: Arc::new(| text: &str | tracing::info!( target: "module::stdout", "{}", text )),
			print_err: Arc::new(| text: &str | tracing::error!( target: "module::stderr", "{}", text )),
			on_runtime_initialized: None,
			on_abort: None,
		}
	}

	/// Replaces the asset routing function.
	pub fn with_locate_file( mut self, locate_file: impl Fn( &str, &str ) -> String + Send + Sync + 'static ) -> Self {
		self.locate_file = Arc::new( locate_file );
		self
	}

	/// Routes `.wasm` and `.data` assets to `asset_dir` using [`default_locate_file`].
	pub fn with_asset_dir( mut self, asset_dir: impl Into<String> ) -> Self {
		self.locate_file = default_locate_file( asset_dir );
		self
	}

	/// Sets the sink for the module's normal output.
	pub fn with_print( mut self, print: impl Fn( &str ) + Send + Sync + 'static ) -> Self {
		self.print = Arc::new( print );
		self
	}

	/// Sets the sink for the module's error output.
	pub fn with_print_err( mut self, print_err: impl Fn( &str ) + Send + Sync + 'static ) -> Self {
		self.print_err = Arc::new( print_err );
		self
	}

	/// Called once when the runtime finishes initializing.
	pub fn on_runtime_initialized( mut self, callback: impl FnOnce() + Send + 'static ) -> Self {
		self.on_runtime_initialized = Some( Box::new( callback ));
		self
	}

	/// Called at most once, with a diagnostic, if initialization cannot complete.
	pub fn on_abort( mut self, callback: impl FnOnce( &str ) + Send + 'static ) -> Self {
		self.on_abort = Some( Box::new( callback ));
		self
	}

	/// Resolves an asset name through the configured routing function.
	pub fn locate_file( &self, path: &str, script_directory: &str ) -> String {
		( self.locate_file )( path, script_directory )
	}

	/// The surface this configuration binds output to.
	pub fn surface( &self ) -> &WeakSurface { &self.surface }

}

impl std::fmt::Debug for RuntimeConfig {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "RuntimeConfig" )
			.field( "surface", &self.surface )
			.field( "locate_file", &"<closure>" )
			.field( "print", &"<closure>" )
			.field( "print_err", &"<closure>" )
			.field( "on_runtime_initialized", &self.on_runtime_initialized.as_ref().map(| _ | "<closure>" ))
			.field( "on_abort", &self.on_abort.as_ref().map(| _ | "<closure>" ))
			.finish()
	}
}
