//! Wasmtime glue: host imports, runtime initialization and the ready module handle.
//!
//! A module talks to the host through imports in the `env` namespace:
//!
//! | import                              | effect                                              |
//! |-------------------------------------|-----------------------------------------------------|
//! | `print( ptr, len )`                 | normal output sink                                  |
//! | `print_err( ptr, len )`             | error output sink                                   |
//! | `present( ptr, len )`               | copies an RGBA frame onto the surface               |
//! | `surface_width() -> i32`            | surface width, 0 once the host is gone              |
//! | `surface_height() -> i32`           | surface height, 0 once the host is gone             |
//! | `data_size() -> i32`                | size of the preloaded data asset                    |
//! | `data_read( dst, off, len ) -> i32` | copies data asset bytes, -1 when out of range       |
//! | `abort( ptr, len )`                 | aborts with a diagnostic                            |
//!
//! and may export `memory`, `_initialize`, `main`, `frame` and `on_pointer_down`.

use std::sync::{ Arc, Mutex };
use thiserror::Error ;
use wasmtime::{ Caller, Engine, Extern, Instance, Linker, Memory, Module, Store, TypedFunc, WasmParams, WasmResults };

use crate::config::{ AbortCallback, CompletionCallback, LocateFile, OutputSink, RuntimeConfig };
use crate::script::{ AssetSite, LoaderScript };
use crate::surface::WeakSurface ;

const HOST_MODULE: &str = "env" ;



/// Data stored inside the wasmtime `Store` of a running module.
pub(crate) struct RuntimeContext {
	surface: WeakSurface,
	print: OutputSink,
	print_err: OutputSink,
	data: Vec<u8>,
	abort_reason: Option<String>,
}

/// Guarantees the completion and abort callbacks are mutually exclusive and fire at most once.
struct Signals {
	on_runtime_initialized: Option<CompletionCallback>,
	on_abort: Option<AbortCallback>,
	fired: bool,
}

impl Signals {

	fn complete( &mut self ) {
		if std::mem::replace( &mut self.fired, true ) { return }
		self.on_abort = None ;
		if let Some( callback ) = self.on_runtime_initialized.take() { callback() }
	}

	fn abort( &mut self, what: &str ) {
		if std::mem::replace( &mut self.fired, true ) { return }
		self.on_runtime_initialized = None ;
		if let Some( callback ) = self.on_abort.take() { callback( what ) }
	}

}

/// Fetches, compiles and instantiates the module named by `script`, then fires exactly one
/// of the configuration's completion or abort callbacks.
///
/// The error is the abort diagnostic.
pub(crate) async fn initialise(
	engine: &Engine,
	site: &AssetSite,
	script: &LoaderScript,
	script_directory: &str,
	config: RuntimeConfig,
) -> Result<ModuleHandle, String> {

	let RuntimeConfig { surface, locate_file, print, print_err, on_runtime_initialized, on_abort } = config ;
	let mut signals = Signals { on_runtime_initialized, on_abort, fired: false };

	let context = | data | RuntimeContext {
		surface,
		print,
		print_err: Arc::clone( &print_err ),
		data,
		abort_reason: None,
	};

	match instantiate( engine, site, script, script_directory, &locate_file, context ).await {
		Ok( handle ) => {
			signals.complete();
			Ok( handle )
		}
		Err( what ) => {
			print_err( &format!( "Aborted({})", what ));
			signals.abort( &what );
			Err( what )
		}
	}

}

async fn instantiate(
	engine: &Engine,
	site: &AssetSite,
	script: &LoaderScript,
	script_directory: &str,
	locate_file: &LocateFile,
	context: impl FnOnce( Vec<u8> ) -> RuntimeContext,
) -> Result<ModuleHandle, String> {

	let binary_url = locate_file( &script.binary, script_directory );
	tracing::debug!( url = %binary_url, "fetching module binary" );
	let binary = site.fetch( &binary_url ).await
		.map_err(| err | format!( "failed to fetch module binary: {}", err ))?;

	let data = match &script.data {
		Some( name ) => {
			let data_url = locate_file( name, script_directory );
			tracing::debug!( url = %data_url, "fetching data asset" );
			site.fetch( &data_url ).await
				.map_err(| err | format!( "failed to fetch data asset: {}", err ))?
		}
		None => Vec::with_capacity( 0 ),
	};

	let module = Module::new( engine, &binary )
		.map_err(| err | format!( "failed to compile {}: {:#}", binary_url, err ))?;
	let linker = host_linker( engine )
		.map_err(| err | format!( "failed to define host imports: {:#}", err ))?;

	let mut store = Store::new( engine, context( data ));
	let instance = linker.instantiate( &mut store, &module )
		.map_err(| err | format!( "failed to instantiate {}: {:#}", binary_url, err ))?;

	if let Some( initialize ) = instance.get_func( &mut store, "_initialize" ) {
		let initialize = initialize.typed::<(), ()>( &store )
			.map_err(| err | format!( "`_initialize` has an unexpected signature: {:#}", err ))?;
		initialize.call( &mut store, () ).map_err(| err | store.data_mut().abort_reason.take()
			.unwrap_or_else(|| format!( "`_initialize` trapped: {:#}", err ))
		)?;
	}

	let main = EntryPoint::find( &instance, &mut store );
	Ok( ModuleHandle { inner: Arc::new( Mutex::new( RuntimeInstance { store, instance, main, main_started: false })) })

}

fn host_linker( engine: &Engine ) -> wasmtime::Result<Linker<RuntimeContext>> {

	let mut linker = Linker::new( engine );

	linker.func_wrap( HOST_MODULE, "print", | mut caller: Caller<'_, RuntimeContext>, ptr: i32, len: i32 | -> wasmtime::Result<()> {
		let text = guest_text( &mut caller, ptr, len )?;
		( caller.data().print )( &text );
		Ok(())
	})?;

	linker.func_wrap( HOST_MODULE, "print_err", | mut caller: Caller<'_, RuntimeContext>, ptr: i32, len: i32 | -> wasmtime::Result<()> {
		let text = guest_text( &mut caller, ptr, len )?;
		( caller.data().print_err )( &text );
		Ok(())
	})?;

	linker.func_wrap( HOST_MODULE, "present", | mut caller: Caller<'_, RuntimeContext>, ptr: i32, len: i32 | -> wasmtime::Result<()> {
		// A torn-down host still lets the module run; its frames just go nowhere.
		if !caller.data().surface.is_alive() { return Ok(()) }
		let frame = guest_bytes( &mut caller, ptr, len )?;
		caller.data().surface.present( &frame )?;
		Ok(())
	})?;

	linker.func_wrap( HOST_MODULE, "surface_width", | caller: Caller<'_, RuntimeContext> | -> i32 {
		caller.data().surface.dimensions().map_or( 0, |( width, _ )| saturate( width as usize ))
	})?;

	linker.func_wrap( HOST_MODULE, "surface_height", | caller: Caller<'_, RuntimeContext> | -> i32 {
		caller.data().surface.dimensions().map_or( 0, |( _, height )| saturate( height as usize ))
	})?;

	linker.func_wrap( HOST_MODULE, "data_size", | caller: Caller<'_, RuntimeContext> | -> i32 {
		saturate( caller.data().data.len() )
	})?;

	linker.func_wrap( HOST_MODULE, "data_read", | mut caller: Caller<'_, RuntimeContext>, dst: i32, offset: i32, len: i32 | -> wasmtime::Result<i32> {
		let ( Ok( offset ), Ok( len )) = ( usize::try_from( offset ), usize::try_from( len )) else { return Ok( -1 )};
		let chunk = offset.checked_add( len )
			.and_then(| end | caller.data().data.get( offset..end ))
			.map( <[u8]>::to_vec );
		let Some( chunk ) = chunk else { return Ok( -1 )};
		guest_memory( &mut caller )?.write( &mut caller, usize::try_from( dst )?, &chunk )?;
		Ok( saturate( chunk.len() ))
	})?;

	linker.func_wrap( HOST_MODULE, "abort", | mut caller: Caller<'_, RuntimeContext>, ptr: i32, len: i32 | -> wasmtime::Result<()> {
		let what = guest_text( &mut caller, ptr, len )?;
		caller.data_mut().abort_reason = Some( what.clone() );
		Err( wasmtime::Error::msg( format!( "module aborted: {}", what )))
	})?;

	Ok( linker )

}

fn saturate( value: usize ) -> i32 { i32::try_from( value ).unwrap_or( i32::MAX ) }

fn guest_memory( caller: &mut Caller<'_, RuntimeContext> ) -> wasmtime::Result<Memory> {
	caller.get_export( "memory" )
		.and_then( Extern::into_memory )
		.ok_or_else(|| wasmtime::Error::msg( "module does not export `memory`" ))
}

fn guest_bytes( caller: &mut Caller<'_, RuntimeContext>, ptr: i32, len: i32 ) -> wasmtime::Result<Vec<u8>> {
	let memory = guest_memory( caller )?;
	let out_of_bounds = || wasmtime::Error::msg( format!( "guest range {}+{} is outside linear memory", ptr, len ));
	let start = usize::try_from( ptr ).map_err(|_| out_of_bounds() )?;
	let end = usize::try_from( len ).ok()
		.and_then(| len | start.checked_add( len ))
		.ok_or_else( out_of_bounds )?;
	memory.data( &*caller ).get( start..end )
		.map( <[u8]>::to_vec )
		.ok_or_else( out_of_bounds )
}

fn guest_text( caller: &mut Caller<'_, RuntimeContext>, ptr: i32, len: i32 ) -> wasmtime::Result<String> {
	Ok( String::from_utf8_lossy( &guest_bytes( caller, ptr, len )? ).into_owned() )
}



/// Errors that can occur when calling into a ready module.
#[derive( Error, Debug )]
pub enum InvocationError {
	/// Failed to acquire lock on the module (a previous call panicked).
	#[error( "Lock Rejected" )] LockRejected,
	/// The module does not export the function, or exports it with another signature.
	#[error( "Missing Export: {0}" )] MissingExport( String ),
	/// The module called `abort` with this diagnostic.
	#[error( "Module Aborted: {0}" )] Aborted( String ),
	/// The WASM function trapped.
	#[error( "Runtime Exception" )] RuntimeException( wasmtime::Error ),
}

enum EntryPoint {
	Argv( TypedFunc<( i32, i32 ), i32> ),
	Void( TypedFunc<(), i32> ),
}

impl EntryPoint {
	fn find( instance: &Instance, store: &mut Store<RuntimeContext> ) -> Option<Self> {
		if let Ok( main ) = instance.get_typed_func::<( i32, i32 ), i32>( &mut *store, "main" ) {
			return Some( Self::Argv( main ));
		}
		instance.get_typed_func::<(), i32>( &mut *store, "main" ).ok().map( Self::Void )
	}
}

struct RuntimeInstance {
	store: Store<RuntimeContext>,
	instance: Instance,
	main: Option<EntryPoint>,
	main_started: bool,
}

impl RuntimeInstance {

	fn trap( &mut self, error: wasmtime::Error ) -> InvocationError {
		match self.store.data_mut().abort_reason.take() {
			Some( what ) => InvocationError::Aborted( what ),
			None => InvocationError::RuntimeException( error ),
		}
	}

	fn run_main( &mut self ) -> Result<i32, InvocationError> {
		self.main_started = true ;
		let result = match &self.main {
			Some( EntryPoint::Argv( main )) => main.call( &mut self.store, ( 0, 0 )),
			Some( EntryPoint::Void( main )) => main.call( &mut self.store, () ),
			None => return Err( InvocationError::MissingExport( "main".to_string() )),
		};
		result.map_err(| err | self.trap( err ))
	}

	fn call_export<Params, Results>( &mut self, name: &str, params: Params ) -> Result<Results, InvocationError>
	where
		Params: WasmParams,
		Results: WasmResults,
	{
		let func = self.instance.get_typed_func::<Params, Results>( &mut self.store, name )
			.map_err(|_| InvocationError::MissingExport( name.to_string() ))?;
		func.call( &mut self.store, params ).map_err(| err | self.trap( err ))
	}

}

/// A ready module, shared between the loader and the host that acquired it.
///
/// Cloning the handle yields another reference to the same running instance.
#[derive( Clone )]
pub struct ModuleHandle {
	inner: Arc<Mutex<RuntimeInstance>>,
}

impl ModuleHandle {

	/// Whether the module exports a callable `main`.
	pub fn has_main( &self ) -> bool {
		self.inner.lock().is_ok_and(| runtime | runtime.main.is_some() )
	}

	/// Runs the module's `main` and returns its exit code.
	///
	/// # Errors
	/// Fails if there is no `main` or it traps.
	pub fn run_main( &self ) -> Result<i32, InvocationError> {
		self.inner.lock().map_err(|_| InvocationError::LockRejected )?.run_main()
	}

	/// Runs `main` the first time any clone of this handle starts the module.
	///
	/// Returns the exit code of that first run, and `None` on later calls or when the
	/// module has no `main`.
	///
	/// # Errors
	/// Fails if `main` traps.
	pub fn start( &self ) -> Result<Option<i32>, InvocationError> {
		let mut runtime = self.inner.lock().map_err(|_| InvocationError::LockRejected )?;
		if runtime.main.is_none() || std::mem::replace( &mut runtime.main_started, true ) { return Ok( None ) }
		runtime.run_main().map( Some )
	}

	/// Runs one iteration of the module's main loop (its `frame` export).
	///
	/// # Errors
	/// Fails if there is no `frame` export or it traps.
	pub fn frame( &self ) -> Result<(), InvocationError> {
		self.inner.lock().map_err(|_| InvocationError::LockRejected )?
			.call_export( "frame", () )
	}

	/// Delivers a pointer press at surface coordinates `( x, y )`.
	///
	/// # Errors
	/// Fails if there is no `on_pointer_down` export or it traps.
	pub fn pointer_down( &self, x: i32, y: i32 ) -> Result<(), InvocationError> {
		self.inner.lock().map_err(|_| InvocationError::LockRejected )?
			.call_export( "on_pointer_down", ( x, y ))
	}

	/// Whether both handles refer to the same running instance.
	pub fn ptr_eq( &self, other: &Self ) -> bool { Arc::ptr_eq( &self.inner, &other.inner ) }

}

impl std::fmt::Debug for ModuleHandle {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ModuleHandle" )
			.field( "instance", &"<Instance>" )
			.field( "has_main", &self.has_main() )
			.finish_non_exhaustive()
	}
}
