//! Parsed package container with queryable tables.

use rustc_hash::FxHashMap;
use veles_common::{ByteCursor, CoverageReport};
use zerocopy::FromBytes;

use crate::error::{Error, Result};
use crate::header::{PackageHeader, PACKAGE_MAGIC};
use crate::tables::{ExportEntry, ImportEntry, NameEntry, RawExport, RawImport};

/// A parsed package file.
///
/// Holds the header and the three resolved tables, plus lookup maps for
/// the common queries. The struct borrows the file buffer; export bytes
/// are sliced out of it on demand and never copied.
#[derive(Debug)]
pub struct Package<'a> {
    data: &'a [u8],
    /// The fixed header.
    pub header: PackageHeader,
    /// The name table.
    pub names: Vec<NameEntry>,
    /// The import table.
    pub imports: Vec<ImportEntry>,
    /// The export table. Malformed records are kept as placeholders so
    /// positive object indices stay dense.
    pub exports: Vec<ExportEntry>,
    /// Byte accounting for the header, tables and export serial ranges.
    pub coverage: CoverageReport,
    by_class: FxHashMap<String, Vec<usize>>,
}

impl<'a> Package<'a> {
    /// Parse a package from a fully-loaded file buffer.
    ///
    /// Fails on a missing magic tag or a table offset past the end of the
    /// buffer. Individual import/export records that cannot be decoded do
    /// not fail the file; they become placeholder entries and are counted
    /// as anomalies in [`coverage`](Self::coverage).
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let (header, _) = PackageHeader::read_from_prefix(data).map_err(|_| {
            veles_common::Error::OutOfBounds {
                needed: PackageHeader::SIZE,
                available: data.len(),
            }
        })?;
        if header.tag != PACKAGE_MAGIC {
            return Err(Error::NotAContainer {
                expected: PACKAGE_MAGIC,
                actual: header.tag,
            });
        }

        let mut coverage = CoverageReport::new(data.len());
        coverage.explain(0, PackageHeader::SIZE, "header");

        let names = parse_names(data, &header, &mut coverage)?;
        let imports = parse_imports(data, &header, &names, &mut coverage)?;
        let exports = parse_exports(data, &header, &names, &imports, &mut coverage)?;

        for export in &exports {
            if export.malformed || export.serial_size <= 0 {
                continue;
            }
            let start = export.serial_offset as usize;
            let end = start + export.serial_size as usize;
            if end <= data.len() {
                coverage.explain(start, end, &format!("export {}", export.object_name));
            }
        }
        mark_gaps(&mut coverage);

        let mut by_class: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        for (i, export) in exports.iter().enumerate() {
            if export.malformed {
                continue;
            }
            by_class.entry(export.class_name.clone()).or_default().push(i);
        }

        Ok(Self {
            data,
            header,
            names,
            imports,
            exports,
            coverage,
            by_class,
        })
    }

    /// The underlying file buffer.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Find the first export whose object name contains `pattern`. When
    /// several match, the one with the lowest table index wins.
    pub fn find_export(&self, pattern: &str) -> Option<&ExportEntry> {
        self.exports
            .iter()
            .find(|e| !e.malformed && e.object_name.contains(pattern))
    }

    /// All exports whose resolved class name matches.
    pub fn exports_by_class(&self, class_name: &str) -> Vec<&ExportEntry> {
        match self.by_class.get(class_name) {
            Some(indices) => indices.iter().map(|&i| &self.exports[i]).collect(),
            None => Vec::new(),
        }
    }

    /// Slice out an export's serialized bytes.
    ///
    /// Returns an empty slice when the export has no serial data.
    pub fn export_bytes(&self, export: &ExportEntry) -> Result<&'a [u8]> {
        if export.serial_size <= 0 {
            return Ok(&[]);
        }
        let start = export.serial_offset as usize;
        let end = start.saturating_add(export.serial_size as usize);
        if export.serial_offset < 0 || end > self.data.len() {
            return Err(Error::SerialOutOfRange {
                index: export.index as usize,
                offset: export.serial_offset,
                size: export.serial_size,
                file_len: self.data.len(),
            });
        }
        Ok(&self.data[start..end])
    }

    /// Resolve a name-table index to its string.
    pub fn resolve_name(&self, index: i64) -> Result<&str> {
        resolve_name(&self.names, index)
    }

    /// Resolve an object reference to a name: positive indices address the
    /// export table, negative the import table, zero is "no object".
    pub fn resolve_object_name(&self, index: i64) -> Option<&str> {
        if index > 0 {
            self.exports
                .get(index as usize - 1)
                .map(|e| e.object_name.as_str())
        } else if index < 0 {
            self.imports
                .get((-index) as usize - 1)
                .map(|i| i.object_name.as_str())
        } else {
            None
        }
    }

    /// Get an import by its negative object index.
    pub fn import_by_index(&self, index: i64) -> Option<&ImportEntry> {
        if index < 0 {
            self.imports.get((-index) as usize - 1)
        } else {
            None
        }
    }
}

fn table_start(data: &[u8], table: &'static str, count: u32, offset: u32) -> Result<usize> {
    let start = offset as usize;
    if count > 0 && start >= data.len() {
        return Err(Error::TruncatedContainer {
            table,
            count,
            offset,
            file_len: data.len(),
        });
    }
    Ok(start)
}

fn resolve_name(names: &[NameEntry], index: i64) -> Result<&str> {
    if index < 0 || index as usize >= names.len() {
        return Err(Error::ReferenceOutOfRange {
            table: "name",
            index,
            len: names.len(),
        });
    }
    Ok(&names[index as usize].name)
}

fn parse_names(
    data: &[u8],
    header: &PackageHeader,
    coverage: &mut CoverageReport,
) -> Result<Vec<NameEntry>> {
    let count = header.name_count;
    let start = table_start(data, "name", count, header.name_offset)?;
    let mut cursor = ByteCursor::new_at(data, start);
    let mut names = Vec::with_capacity(count as usize);
    for i in 0..count as usize {
        names.push(NameEntry::parse(&mut cursor, i)?);
    }
    coverage.explain(start, cursor.position(), "name table");
    Ok(names)
}

fn parse_imports(
    data: &[u8],
    header: &PackageHeader,
    names: &[NameEntry],
    coverage: &mut CoverageReport,
) -> Result<Vec<ImportEntry>> {
    let count = header.import_count;
    let start = table_start(data, "import", count, header.import_offset)?;
    let mut cursor = ByteCursor::new_at(data, start);
    let mut imports = Vec::with_capacity(count as usize);
    for i in 0..count as usize {
        let record_start = cursor.position();
        let raw = match RawImport::parse(&mut cursor) {
            Ok(raw) => raw,
            Err(_) => {
                // A variable-length record failed; nothing after it in
                // this table can be trusted.
                coverage.mark_unknown_labeled(
                    record_start,
                    data.len(),
                    Some("unreadable import records".to_string()),
                );
                coverage.note_anomalies(count as usize - i);
                for _ in i..count as usize {
                    imports.push(placeholder_import(imports.len()));
                }
                return Ok(imports);
            }
        };
        // Imports are display-only metadata, so a bad name reference
        // degrades to an empty string instead of dropping the record.
        let mut bad_refs = 0;
        let mut name_of = |idx: i64| match resolve_name(names, idx) {
            Ok(s) => s.to_string(),
            Err(_) => {
                bad_refs += 1;
                String::new()
            }
        };
        let entry = ImportEntry {
            index: -(i as i64 + 1),
            class_package: name_of(raw.class_package),
            class_name: name_of(raw.class_name),
            package: raw.package,
            object_name: name_of(raw.object_name),
        };
        coverage.note_anomalies(bad_refs);
        imports.push(entry);
    }
    coverage.explain(start, cursor.position(), "import table");
    Ok(imports)
}

fn parse_exports(
    data: &[u8],
    header: &PackageHeader,
    names: &[NameEntry],
    imports: &[ImportEntry],
    coverage: &mut CoverageReport,
) -> Result<Vec<ExportEntry>> {
    let count = header.export_count;
    let start = table_start(data, "export", count, header.export_offset)?;
    let mut cursor = ByteCursor::new_at(data, start);

    let mut raws: Vec<Option<RawExport>> = Vec::with_capacity(count as usize);
    for i in 0..count as usize {
        let record_start = cursor.position();
        match RawExport::parse(&mut cursor) {
            Ok(raw) => raws.push(Some(raw)),
            Err(_) => {
                coverage.mark_unknown_labeled(
                    record_start,
                    data.len(),
                    Some("unreadable export records".to_string()),
                );
                coverage.note_anomalies(count as usize - i);
                for _ in i..count as usize {
                    raws.push(None);
                }
                break;
            }
        }
    }
    if raws.iter().all(|r| r.is_some()) {
        coverage.explain(start, cursor.position(), "export table");
    }

    // Object names first, then class names: a positive class reference
    // points at another export's object name, which may come later in
    // the table.
    let mut object_names = Vec::with_capacity(raws.len());
    for raw in &raws {
        let resolved = raw
            .as_ref()
            .and_then(|raw| resolve_name(names, raw.object_name).ok())
            .map(str::to_string);
        object_names.push(resolved);
    }

    let mut exports = Vec::with_capacity(raws.len());
    for (i, raw) in raws.into_iter().enumerate() {
        let (raw, object_name) = match (raw, object_names[i].clone()) {
            (Some(raw), Some(name)) => (raw, name),
            _ => {
                coverage.note_anomalies(1);
                exports.push(placeholder_export(i));
                continue;
            }
        };
        let class_name = resolve_class_name(raw.class_index, imports, &object_names);
        exports.push(ExportEntry {
            index: i as i64 + 1,
            class_index: raw.class_index,
            class_name,
            super_index: raw.super_index,
            package: raw.package,
            object_name,
            object_flags: raw.object_flags,
            serial_size: raw.serial_size,
            serial_offset: raw.serial_offset,
            malformed: false,
        });
    }
    Ok(exports)
}

/// Resolve an export's class reference. Zero means the export is itself a
/// class definition.
fn resolve_class_name(
    class_index: i64,
    imports: &[ImportEntry],
    export_names: &[Option<String>],
) -> String {
    if class_index < 0 {
        if let Some(import) = imports.get((-class_index) as usize - 1) {
            return import.object_name.clone();
        }
    } else if class_index > 0 {
        if let Some(Some(name)) = export_names.get(class_index as usize - 1) {
            return name.clone();
        }
    }
    "Class".to_string()
}

fn placeholder_import(position: usize) -> ImportEntry {
    ImportEntry {
        index: -(position as i64 + 1),
        class_package: String::new(),
        class_name: String::new(),
        package: 0,
        object_name: String::new(),
    }
}

fn placeholder_export(position: usize) -> ExportEntry {
    ExportEntry {
        index: position as i64 + 1,
        class_index: 0,
        class_name: String::new(),
        super_index: 0,
        package: 0,
        object_name: String::new(),
        object_flags: 0,
        serial_size: 0,
        serial_offset: 0,
        malformed: true,
    }
}

/// Mark every byte claimed by neither the header, a table nor an export's
/// serial range as unknown.
fn mark_gaps(coverage: &mut CoverageReport) {
    let mut pos = 0;
    let mut gaps = Vec::new();
    for range in coverage.merged_explained() {
        if range.0 > pos {
            gaps.push((pos, range.0));
        }
        pos = pos.max(range.1);
    }
    if pos < coverage.total {
        gaps.push((pos, coverage.total));
    }
    for (start, end) in gaps {
        coverage.mark_unknown(start, end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veles_common::compact;

    fn push_name(buf: &mut Vec<u8>, name: &str, flags: u32) {
        let mut bytes = name.as_bytes().to_vec();
        bytes.push(0);
        buf.extend_from_slice(&compact::encode(bytes.len() as i64).unwrap());
        buf.extend_from_slice(&bytes);
        buf.extend_from_slice(&flags.to_le_bytes());
    }

    fn push_export(buf: &mut Vec<u8>, class: i64, name: i64, size: i64, offset: i64) {
        buf.extend_from_slice(&compact::encode(class).unwrap());
        buf.extend_from_slice(&compact::encode(0).unwrap()); // super
        buf.extend_from_slice(&0i32.to_le_bytes()); // package
        buf.extend_from_slice(&compact::encode(name).unwrap());
        buf.extend_from_slice(&0u32.to_le_bytes()); // flags
        buf.extend_from_slice(&compact::encode(size).unwrap());
        if size > 0 {
            buf.extend_from_slice(&compact::encode(offset).unwrap());
        }
    }

    fn push_import(buf: &mut Vec<u8>, class_package: i64, class_name: i64, object_name: i64) {
        buf.extend_from_slice(&compact::encode(class_package).unwrap());
        buf.extend_from_slice(&compact::encode(class_name).unwrap());
        buf.extend_from_slice(&0i32.to_le_bytes());
        buf.extend_from_slice(&compact::encode(object_name).unwrap());
    }

    fn header_bytes(
        name: (u32, u32),
        export: (u32, u32),
        import: (u32, u32),
    ) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&PACKAGE_MAGIC.to_le_bytes());
        buf.extend_from_slice(&128u16.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        for (count, offset) in [name, export, import] {
            buf.extend_from_slice(&count.to_le_bytes());
            buf.extend_from_slice(&offset.to_le_bytes());
        }
        buf
    }

    /// A header, one name ("None"), one export with no serial data.
    fn minimal_container() -> Vec<u8> {
        let mut names = Vec::new();
        push_name(&mut names, "None", 0);
        let name_offset = PackageHeader::SIZE as u32;
        let export_offset = name_offset + names.len() as u32;

        let mut exports = Vec::new();
        push_export(&mut exports, 0, 0, 0, 0);

        let mut buf = header_bytes((1, name_offset), (1, export_offset), (0, 0));
        buf.extend_from_slice(&names);
        buf.extend_from_slice(&exports);
        buf
    }

    #[test]
    fn test_minimal_container() {
        let data = minimal_container();
        let package = Package::parse(&data).unwrap();

        assert_eq!(package.header.file_version, 128);
        assert_eq!(package.names.len(), 1);
        assert_eq!(package.names[0].name, "None");
        assert!(package.imports.is_empty());
        assert_eq!(package.exports.len(), 1);

        let export = &package.exports[0];
        assert_eq!(export.object_name, "None");
        assert_eq!(export.class_name, "Class");
        assert_eq!(export.serial_size, 0);
        assert!(package.export_bytes(export).unwrap().is_empty());

        assert_eq!(package.coverage.bytes_unknown(), 0);
        assert_eq!(package.coverage.bytes_explained(), data.len());
        assert!(package.coverage.is_complete());
    }

    #[test]
    fn test_rejects_wrong_magic() {
        let mut data = minimal_container();
        data[0] = 0x00;
        match Package::parse(&data) {
            Err(Error::NotAContainer { expected, .. }) => {
                assert_eq!(expected, PACKAGE_MAGIC);
            }
            other => panic!("expected NotAContainer, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_table_offset_past_eof() {
        let data = header_bytes((1, 4096), (0, 0), (0, 0));
        match Package::parse(&data) {
            Err(Error::TruncatedContainer { table, .. }) => assert_eq!(table, "name"),
            other => panic!("expected TruncatedContainer, got {other:?}"),
        }
    }

    #[test]
    fn test_class_resolution_and_queries() {
        // names: 0 "None", 1 "Engine", 2 "StaticMesh", 3 "rock01", 4 "tree01"
        let mut names = Vec::new();
        for name in ["None", "Engine", "StaticMesh", "rock01", "tree01"] {
            push_name(&mut names, name, 0);
        }
        let name_offset = PackageHeader::SIZE as u32;

        // one import: class "StaticMesh" from package "Engine"
        let mut imports = Vec::new();
        push_import(&mut imports, 1, 2, 2);
        let import_offset = name_offset + names.len() as u32;

        // serial bytes sit between the import and export tables; table
        // offsets are absolute so the order is ours to choose
        let serial = [0xABu8; 8];
        let serial_offset = import_offset + imports.len() as u32;
        let export_offset = serial_offset + serial.len() as u32;

        let mut exports = Vec::new();
        push_export(&mut exports, -1, 3, serial.len() as i64, serial_offset as i64);
        push_export(&mut exports, -1, 4, 0, 0);

        let mut data = header_bytes((5, name_offset), (2, export_offset), (1, import_offset));
        data.extend_from_slice(&names);
        data.extend_from_slice(&imports);
        data.extend_from_slice(&serial);
        data.extend_from_slice(&exports);

        let package = Package::parse(&data).unwrap();
        assert_eq!(package.imports[0].object_name, "StaticMesh");
        assert_eq!(package.imports[0].class_package, "Engine");

        let meshes = package.exports_by_class("StaticMesh");
        assert_eq!(meshes.len(), 2);
        assert_eq!(meshes[0].object_name, "rock01");

        let rock = package.find_export("rock01").unwrap();
        assert_eq!(package.export_bytes(rock).unwrap(), &serial);
        assert_eq!(package.resolve_object_name(1), Some("rock01"));
        assert_eq!(package.resolve_object_name(-1), Some("StaticMesh"));
        assert_eq!(package.resolve_object_name(0), None);
        assert_eq!(package.resolve_name(2).unwrap(), "StaticMesh");
        assert!(package.resolve_name(99).is_err());

        assert!(package.coverage.is_complete());
    }

    #[test]
    fn test_find_export_matches_substring() {
        let mut names = Vec::new();
        push_name(&mut names, "None", 0);
        push_name(&mut names, "TerrainChunk10", 0);
        push_name(&mut names, "TerrainChunk11", 0);
        let name_offset = PackageHeader::SIZE as u32;
        let export_offset = name_offset + names.len() as u32;

        let mut exports = Vec::new();
        push_export(&mut exports, 0, 1, 0, 0);
        push_export(&mut exports, 0, 2, 0, 0);

        let mut data = header_bytes((3, name_offset), (2, export_offset), (0, 0));
        data.extend_from_slice(&names);
        data.extend_from_slice(&exports);

        let package = Package::parse(&data).unwrap();
        // partial name hits, earliest table entry wins
        let hit = package.find_export("Chunk").unwrap();
        assert_eq!(hit.object_name, "TerrainChunk10");
        assert_eq!(
            package.find_export("Chunk11").unwrap().object_name,
            "TerrainChunk11"
        );
        assert!(package.find_export("Mesh").is_none());
    }

    #[test]
    fn test_bad_name_reference_keeps_file_parsable() {
        let mut names = Vec::new();
        push_name(&mut names, "None", 0);
        push_name(&mut names, "ok", 0);
        let name_offset = PackageHeader::SIZE as u32;
        let export_offset = name_offset + names.len() as u32;

        let mut exports = Vec::new();
        push_export(&mut exports, 0, 40, 0, 0); // name index out of range
        push_export(&mut exports, 0, 1, 0, 0);

        let mut data = header_bytes((2, name_offset), (2, export_offset), (0, 0));
        data.extend_from_slice(&names);
        data.extend_from_slice(&exports);

        let package = Package::parse(&data).unwrap();
        assert_eq!(package.exports.len(), 2);
        assert!(package.exports[0].malformed);
        assert!(!package.exports[1].malformed);
        assert_eq!(package.exports[1].object_name, "ok");
        assert_eq!(package.coverage.anomalies, 1);
        assert!(package.find_export("ok").is_some());
    }

    #[test]
    fn test_serial_range_past_eof_is_an_error() {
        let mut names = Vec::new();
        push_name(&mut names, "None", 0);
        let name_offset = PackageHeader::SIZE as u32;
        let export_offset = name_offset + names.len() as u32;

        let mut exports = Vec::new();
        push_export(&mut exports, 0, 0, 4096, 50);

        let mut data = header_bytes((1, name_offset), (1, export_offset), (0, 0));
        data.extend_from_slice(&names);
        data.extend_from_slice(&exports);

        let package = Package::parse(&data).unwrap();
        let export = &package.exports[0];
        assert!(matches!(
            package.export_bytes(export),
            Err(Error::SerialOutOfRange { .. })
        ));
    }
}
