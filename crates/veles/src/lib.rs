//! Veles - decoders for a proprietary game package container format.
//!
//! This crate provides a unified interface to the Veles crate ecosystem
//! for reverse-engineered package file decoding.
//!
//! # Crates
//!
//! - [`veles_common`] - Common utilities (byte cursor, compact indices, coverage reports)
//! - [`veles_package`] - Package container parsing (header, name/import/export tables)
//! - [`veles_props`] - Tagged property stream decoding
//! - [`veles_mesh`] - Adaptive static-mesh geometry decoding
//! - [`veles_terrain`] - Terrain heightmap and texture decoding
//!
//! # Example
//!
//! ```no_run
//! use veles::prelude::*;
//!
//! # fn demo(file_bytes: &[u8]) -> Result<(), veles::Error> {
//! let package = Package::parse(file_bytes)?;
//!
//! for export in package.exports_by_class("StaticMesh") {
//!     let decoded = veles::decode_static_mesh(&package, export)?;
//!     println!(
//!         "{}: {} LODs, {:.1}% explained",
//!         export.object_name,
//!         decoded.mesh.lods.len(),
//!         100.0 * decoded.coverage.bytes_explained() as f64
//!             / decoded.coverage.total.max(1) as f64,
//!     );
//! }
//! # Ok(())
//! # }
//! ```

use thiserror::Error;

use veles_package::{ExportEntry, Package};
use veles_props::{DecodedProperties, PropertyDecoder};

// Re-export all sub-crates
pub use veles_common as common;
pub use veles_mesh as mesh;
pub use veles_package as package;
pub use veles_props as props;
pub use veles_terrain as terrain;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use veles_common::{ByteCursor, CoverageReport, Detected};
    pub use veles_mesh::{DecodedMesh, StaticMeshDecoder};
    pub use veles_package::{ExportEntry, ImportEntry, Package};
    pub use veles_props::{DecodedProperties, PropertyDecoder, TaggedProperty};
    pub use veles_terrain::{
        DecodedHeightmap, DecodedTexture, TerrainHeightmapDecoder, TerrainTextureDecoder,
        TextureClass,
    };
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Errors from the combined decode helpers.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Package(#[from] veles_package::Error),
    #[error("{0}")]
    Props(#[from] veles_props::Error),
    #[error("{0}")]
    Mesh(#[from] veles_mesh::Error),
    #[error("{0}")]
    Terrain(#[from] veles_terrain::Error),
    /// A decode helper needed a property the export does not carry.
    #[error("export {name} is missing required property {property}")]
    MissingProperty {
        name: String,
        property: &'static str,
    },
}

/// The package's name table as plain strings, in table order, for
/// [`PropertyDecoder`].
pub fn name_strings(package: &Package<'_>) -> Vec<String> {
    package.names.iter().map(|n| n.name.clone()).collect()
}

/// Decode the tagged property block of an export.
pub fn decode_properties(
    package: &Package<'_>,
    export: &ExportEntry,
) -> Result<DecodedProperties, Error> {
    let data = package.export_bytes(export)?;
    let names = name_strings(package);
    Ok(PropertyDecoder::new(&names).decode(data, 0)?)
}

/// Decode a static-mesh export: properties first, then the geometry
/// behind them. Caveats from the property pass are folded into the mesh
/// coverage report.
pub fn decode_static_mesh(
    package: &Package<'_>,
    export: &ExportEntry,
) -> Result<veles_mesh::DecodedMesh, Error> {
    let data = package.export_bytes(export)?;
    let names = name_strings(package);
    let properties = PropertyDecoder::new(&names).decode(data, 0)?;

    let mut decoded = veles_mesh::StaticMeshDecoder::new().decode(
        data,
        properties.end,
        export.serial_offset as u32,
    )?;
    decoded.coverage.absorb_flags(&properties.coverage);
    Ok(decoded)
}

/// Decode a terrain heightmap export, taking its dimensions from the
/// `USize`/`VSize` properties.
pub fn decode_heightmap(
    package: &Package<'_>,
    export: &ExportEntry,
) -> Result<veles_terrain::DecodedHeightmap, Error> {
    let data = package.export_bytes(export)?;
    let properties = decode_properties(package, export)?;
    let width = required_int(&properties, export, "USize")?;
    let height = required_int(&properties, export, "VSize")?;

    let mut decoded =
        veles_terrain::TerrainHeightmapDecoder::new().decode(data, width as u32, height as u32)?;
    decoded.coverage.absorb_flags(&properties.coverage);
    Ok(decoded)
}

/// Decode a texture export, taking its format and dimensions from the
/// `Format`/`USize`/`VSize` properties.
pub fn decode_texture(
    package: &Package<'_>,
    export: &ExportEntry,
    class: veles_terrain::TextureClass,
) -> Result<veles_terrain::DecodedTexture, Error> {
    let data = package.export_bytes(export)?;
    let properties = decode_properties(package, export)?;
    let format = required_int(&properties, export, "Format")?;
    let width = required_int(&properties, export, "USize")?;
    let height = required_int(&properties, export, "VSize")?;

    let mut decoded = veles_terrain::TerrainTextureDecoder::new().decode(
        data,
        format as u8,
        width as u32,
        height as u32,
        class,
    )?;
    decoded.coverage.absorb_flags(&properties.coverage);
    Ok(decoded)
}

fn required_int(
    properties: &DecodedProperties,
    export: &ExportEntry,
    property: &'static str,
) -> Result<i64, Error> {
    properties
        .get_int(property)
        .ok_or_else(|| Error::MissingProperty {
            name: export.object_name.clone(),
            property,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A minimal container: one name (`None`), one export with an empty
    /// serial payload, no imports.
    fn minimal_package() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&0x9E2A_83C1u32.to_le_bytes());
        data.extend_from_slice(&128u16.to_le_bytes()); // file version
        data.extend_from_slice(&0u16.to_le_bytes()); // licensee
        data.extend_from_slice(&0u32.to_le_bytes()); // flags
        data.extend_from_slice(&1u32.to_le_bytes()); // name count
        data.extend_from_slice(&36u32.to_le_bytes()); // name offset
        data.extend_from_slice(&1u32.to_le_bytes()); // export count
        data.extend_from_slice(&46u32.to_le_bytes()); // export offset
        data.extend_from_slice(&0u32.to_le_bytes()); // import count
        data.extend_from_slice(&58u32.to_le_bytes()); // import offset

        // name table: FString "None" plus flags
        data.push(5);
        data.extend_from_slice(b"None\0");
        data.extend_from_slice(&0u32.to_le_bytes());

        // export table: class 0, super 0, package 0, name 0, flags 0, size 0
        data.push(0);
        data.push(0);
        data.extend_from_slice(&0i32.to_le_bytes());
        data.push(0);
        data.extend_from_slice(&0u32.to_le_bytes());
        data.push(0);
        data
    }

    #[test]
    fn test_property_glue_on_empty_export() {
        let data = minimal_package();
        let package = Package::parse(&data).unwrap();
        assert_eq!(name_strings(&package), vec!["None".to_string()]);

        let export = package.find_export("None").unwrap();
        let properties = decode_properties(&package, export).unwrap();
        assert!(properties.is_empty());
        assert_eq!(properties.end, 0);
    }

    #[test]
    fn test_missing_property_error_names_the_export() {
        let data = minimal_package();
        let package = Package::parse(&data).unwrap();
        let export = package.find_export("None").unwrap();

        let result = decode_heightmap(&package, export);
        assert!(matches!(
            result,
            Err(Error::MissingProperty {
                property: "USize",
                ..
            })
        ));
    }
}
