//! Public Overpass instances.
//!
//! See <https://wiki.openstreetmap.org/wiki/Overpass_API#Public_Overpass_API_instances>
//! for their usage policies before pointing heavy workloads at them.

/// Main instance run by the Overpass API developers. Default for managers.
pub const MAIN: &str = "https://overpass-api.de/api/interpreter";
/// Sibling of [`MAIN`] on a separate server.
pub const LZ4: &str = "https://lz4.overpass-api.de/api/interpreter";
/// Sibling of [`MAIN`] on a separate server.
pub const Z: &str = "https://z.overpass-api.de/api/interpreter";
pub const KUMI: &str = "https://overpass.kumi.systems/api/interpreter";
/// Serves France only.
pub const FRANCE: &str = "https://overpass.openstreetmap.fr/api/interpreter";
pub const PRIVATE_COFFEE: &str = "https://overpass.private.coffee/api/interpreter";

/// Every well-known instance with worldwide coverage.
pub const WORLDWIDE: &[&str] = &[MAIN, LZ4, Z, KUMI, PRIVATE_COFFEE];
