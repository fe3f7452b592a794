//! The loader script and the site it is fetched from.
//!
//! The loader script is a small TOML bootstrap document naming the module binary and,
//! optionally, the data asset preloaded alongside it:
//!
//! ```toml
//! binary = "simple.wasm"
//! data = "simple.data"
//! ```
//!
//! Asset names are routed through [`RuntimeConfig::locate_file`]( crate::RuntimeConfig::locate_file )
//! before being fetched from an [`AssetSite`].

use std::path::{ Component, Path, PathBuf };
use pipe_trait::Pipe ;
use serde::Deserialize ;
use thiserror::Error ;

/// Errors that can occur when fetching an asset from an [`AssetSite`].
#[derive( Error, Debug )]
pub enum FetchError {
	/// Nothing exists at the requested URL path.
	#[error( "Not Found: {0}" )] NotFound( String ),
	/// The URL path is relative or tries to leave the site root.
	#[error( "Invalid Path: {0}" )] InvalidPath( String ),
	/// Reading the asset failed for another reason.
	#[error( "IO error reading {url}: {source}" )] Io { url: String, source: std::io::Error },
}

/// A directory that absolute URL paths (`/wasm/simple.wasm`) are served from.
#[derive( Debug, Clone, PartialEq, Eq )]
pub struct AssetSite {
	root: PathBuf,
}

impl AssetSite {

	pub fn new( root: impl Into<PathBuf> ) -> Self { Self { root: root.into() }}

	#[inline] pub fn root( &self ) -> &Path { &self.root }

	/// Maps an absolute URL path onto the filesystem.
	///
	/// # Errors
	/// Returns [`FetchError::InvalidPath`] for relative paths and paths containing `..`.
	pub fn resolve( &self, url: &str ) -> Result<PathBuf, FetchError> {
		let relative = url.strip_prefix( '/' ).ok_or_else(|| FetchError::InvalidPath( url.to_string() ))?;
		let relative = Path::new( relative );
		if !relative.components().all(| component | matches!( component, Component::Normal( _ ))) {
			return Err( FetchError::InvalidPath( url.to_string() ));
		}
		Ok( self.root.join( relative ))
	}

	/// Fetches the bytes behind `url`.
	///
	/// # Errors
	/// Returns an error if the path is invalid or the file cannot be read.
	pub async fn fetch( &self, url: &str ) -> Result<Vec<u8>, FetchError> {
		let path = self.resolve( url )?;
		tokio::fs::read( &path ).await.map_err(| source | match source.kind() {
			std::io::ErrorKind::NotFound => FetchError::NotFound( url.to_string() ),
			_ => FetchError::Io { url: url.to_string(), source },
		})
	}

}

/// Errors that can occur when executing a fetched loader script.
#[derive( Error, Debug )]
pub enum ScriptError {
	#[error( "Script is not valid UTF-8" )] NotUtf8( #[from] std::string::FromUtf8Error ),
	#[error( "Script error: {0}" )] Parse( #[from] toml::de::Error ),
}

/// The parsed loader script.
#[derive( Debug, Clone, PartialEq, Eq, Deserialize )]
#[serde( deny_unknown_fields )]
pub struct LoaderScript {
	/// Name of the module binary, resolved through `locate_file`.
	pub binary: String,
	/// Name of the data asset to preload, if any.
	#[serde( default )]
	pub data: Option<String>,
}

impl LoaderScript {

	/// Parses fetched script bytes.
	///
	/// # Errors
	/// Returns an error if the bytes are not UTF-8 or not a valid script.
	pub fn parse( bytes: Vec<u8> ) -> Result<Self, ScriptError> {
		String::from_utf8( bytes )?
			.pipe_ref(| source | toml::from_str::<Self>( source ))?
			.pipe( Ok )
	}

}

/// The directory part of a script URL, including the trailing slash.
pub(crate) fn script_directory( script_path: &str ) -> &str {
	match script_path.rfind( '/' ) {
		Some( index ) => &script_path[ ..=index ],
		None => "",
	}
}
