//! Shared domain vocabulary: the mesh, run parameters, source region, and the configuration/I/O
//! errors that bound the transport system's inputs. C1-C8 depend only on this crate and on
//! `neutron-core`; they never depend on the CLI or observability layers above them.

pub mod errors;
pub mod io;
pub mod mesh;
pub mod params;

pub mod prelude {
    pub use crate::errors::{ConfigError, IoError};
    pub use crate::io::{read_cross_section_file, read_cross_section_table};
    pub use crate::mesh::Mesh;
    pub use crate::params::{RunParameters, SourceRegion, TallyMode, ValidationEntry};
}
