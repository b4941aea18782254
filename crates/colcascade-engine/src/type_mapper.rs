//! Data type translation between platforms

use colcascade_core::catalog::platform_key;
use colcascade_core::TypeMappingTable;
use regex::Regex;

/// Leading type name of a parameterised token: `VARCHAR(50)` -> `VARCHAR`
const BASE_TYPE_PATTERN: &str = r"^\s*([A-Za-z][A-Za-z0-9_]*)\s*\(";

/// Translates data type tokens using a mapping table
///
/// Conversion is total: anything the table does not know passes through
/// unchanged.
#[derive(Debug, Clone)]
pub struct TypeMapper {
    table: TypeMappingTable,
    base_type: Option<Regex>,
}

impl TypeMapper {
    pub fn new(table: TypeMappingTable) -> Self {
        Self {
            table,
            base_type: Regex::new(BASE_TYPE_PATTERN).ok(),
        }
    }

    /// Convert `source_type` to its equivalent on `target_platform`
    pub fn convert(&self, source_type: &str, target_platform: &str) -> String {
        if source_type.trim().is_empty() {
            return source_type.to_string();
        }

        let row = self.table.lookup(source_type).or_else(|| {
            self.base_of(source_type)
                .and_then(|base| self.table.lookup(base))
        });

        row.and_then(|row| row.target(target_platform))
            .map(str::to_string)
            .unwrap_or_else(|| source_type.to_string())
    }

    /// Convert a column type moving from one platform to another
    ///
    /// Same platform on both sides is a no-op.
    pub fn convert_between(&self, source_type: &str, from_platform: &str, to_platform: &str) -> String {
        if platform_key(from_platform) == platform_key(to_platform) {
            return source_type.to_string();
        }
        self.convert(source_type, to_platform)
    }

    fn base_of<'a>(&self, source_type: &'a str) -> Option<&'a str> {
        self.base_type
            .as_ref()?
            .captures(source_type)?
            .get(1)
            .map(|m| m.as_str())
    }
}

impl Default for TypeMapper {
    fn default() -> Self {
        Self::new(TypeMappingTable::builtin())
    }
}
