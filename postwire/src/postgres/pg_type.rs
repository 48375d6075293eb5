/// Postgres object identifier.
///
/// The oid type is implemented as an unsigned four-byte integer.
///
/// <https://www.postgresql.org/docs/current/datatype-oid.html>
pub type Oid = u32;

/// A type that have corresponding postgres oid.
pub trait PgType {
    /// The scalar type oid.
    const OID: Oid;
    /// The one dimensional array type of [`PgType::OID`].
    ///
    /// Zero means the type cannot be an array element.
    const ARRAY_OID: Oid;
}

impl<T: PgType + ?Sized> PgType for &T {
    const OID: Oid = T::OID;
    const ARRAY_OID: Oid = T::ARRAY_OID;
}

/// Builtin type oids.
///
/// Only types supported by this crate are listed.
pub mod oid {
    use super::Oid;

    /// Type unspecified, let the server infer it.
    pub const UNSPECIFIED: Oid = 0;

    pub const BOOL: Oid = 16;
    pub const BYTEA: Oid = 17;
    pub const CHAR: Oid = 18;
    pub const NAME: Oid = 19;
    pub const INT8: Oid = 20;
    pub const INT2: Oid = 21;
    pub const INT4: Oid = 23;
    pub const TEXT: Oid = 25;
    pub const OID: Oid = 26;
    pub const JSON: Oid = 114;
    pub const POINT: Oid = 600;
    pub const POLYGON: Oid = 604;
    pub const CIDR: Oid = 650;
    pub const FLOAT4: Oid = 700;
    pub const FLOAT8: Oid = 701;
    pub const UNKNOWN: Oid = 705;
    pub const MACADDR8: Oid = 774;
    pub const MACADDR: Oid = 829;
    pub const INET: Oid = 869;
    pub const BPCHAR: Oid = 1042;
    pub const VARCHAR: Oid = 1043;
    pub const DATE: Oid = 1082;
    pub const TIME: Oid = 1083;
    pub const TIMESTAMP: Oid = 1114;
    pub const TIMESTAMPTZ: Oid = 1184;
    pub const NUMERIC: Oid = 1700;
    pub const VOID: Oid = 2278;
    pub const UUID: Oid = 2950;
    pub const JSONB: Oid = 3802;

    pub const BOOL_ARRAY: Oid = 1000;
    pub const BYTEA_ARRAY: Oid = 1001;
    pub const CHAR_ARRAY: Oid = 1002;
    pub const NAME_ARRAY: Oid = 1003;
    pub const INT2_ARRAY: Oid = 1005;
    pub const INT4_ARRAY: Oid = 1007;
    pub const TEXT_ARRAY: Oid = 1009;
    pub const BPCHAR_ARRAY: Oid = 1014;
    pub const VARCHAR_ARRAY: Oid = 1015;
    pub const INT8_ARRAY: Oid = 1016;
    pub const POINT_ARRAY: Oid = 1017;
    pub const FLOAT4_ARRAY: Oid = 1021;
    pub const FLOAT8_ARRAY: Oid = 1022;
    pub const POLYGON_ARRAY: Oid = 1027;
    pub const OID_ARRAY: Oid = 1028;
    pub const MACADDR_ARRAY: Oid = 1040;
    pub const INET_ARRAY: Oid = 1041;
    pub const TIMESTAMP_ARRAY: Oid = 1115;
    pub const DATE_ARRAY: Oid = 1182;
    pub const TIME_ARRAY: Oid = 1183;
    pub const TIMESTAMPTZ_ARRAY: Oid = 1185;
    pub const NUMERIC_ARRAY: Oid = 1231;
    pub const JSON_ARRAY: Oid = 199;
    pub const CIDR_ARRAY: Oid = 651;
    pub const MACADDR8_ARRAY: Oid = 775;
    pub const UUID_ARRAY: Oid = 2951;
    pub const JSONB_ARRAY: Oid = 3807;
}

/// Static information of a builtin type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeInfo {
    /// Type name as in `pg_type.typname`.
    pub name: &'static str,
    /// Scalar type oid.
    pub oid: Oid,
    /// Array type oid.
    pub array_oid: Oid,
}

macro_rules! types {
    ($($name:literal $oid:ident $array:ident,)*) => {
        &[$(TypeInfo { name: $name, oid: oid::$oid, array_oid: oid::$array },)*]
    };
}

static BUILTIN: TypeTable = TypeTable {
    types: types! {
        "bool" BOOL BOOL_ARRAY,
        "bytea" BYTEA BYTEA_ARRAY,
        "char" CHAR CHAR_ARRAY,
        "name" NAME NAME_ARRAY,
        "int8" INT8 INT8_ARRAY,
        "int2" INT2 INT2_ARRAY,
        "int4" INT4 INT4_ARRAY,
        "text" TEXT TEXT_ARRAY,
        "oid" OID OID_ARRAY,
        "json" JSON JSON_ARRAY,
        "point" POINT POINT_ARRAY,
        "polygon" POLYGON POLYGON_ARRAY,
        "cidr" CIDR CIDR_ARRAY,
        "float4" FLOAT4 FLOAT4_ARRAY,
        "float8" FLOAT8 FLOAT8_ARRAY,
        "macaddr8" MACADDR8 MACADDR8_ARRAY,
        "macaddr" MACADDR MACADDR_ARRAY,
        "inet" INET INET_ARRAY,
        "bpchar" BPCHAR BPCHAR_ARRAY,
        "varchar" VARCHAR VARCHAR_ARRAY,
        "date" DATE DATE_ARRAY,
        "time" TIME TIME_ARRAY,
        "timestamp" TIMESTAMP TIMESTAMP_ARRAY,
        "timestamptz" TIMESTAMPTZ TIMESTAMPTZ_ARRAY,
        "numeric" NUMERIC NUMERIC_ARRAY,
        "uuid" UUID UUID_ARRAY,
        "jsonb" JSONB JSONB_ARRAY,
    },
};

/// Read-only table of the builtin types.
///
/// Maps every supported scalar type to its array type and back.
#[derive(Debug)]
pub struct TypeTable {
    types: &'static [TypeInfo],
}

impl TypeTable {
    /// The builtin type table.
    pub fn builtin() -> &'static TypeTable {
        &BUILTIN
    }

    /// Find scalar type information.
    pub fn get(&self, oid: Oid) -> Option<&TypeInfo> {
        self.types.iter().find(|e| e.oid == oid)
    }

    /// Returns the array type of given scalar type.
    pub fn array_of(&self, oid: Oid) -> Option<Oid> {
        self.get(oid).map(|e| e.array_oid)
    }

    /// Returns the element type of given array type.
    pub fn element_of(&self, array_oid: Oid) -> Option<Oid> {
        self.types.iter().find(|e| e.array_oid == array_oid).map(|e| e.oid)
    }

    /// Returns `true` if given oid is a known array type.
    pub fn is_array(&self, oid: Oid) -> bool {
        self.element_of(oid).is_some()
    }

    /// Returns human readable type name, array type is suffixed with `[]`.
    pub fn name(&self, oid: Oid) -> std::borrow::Cow<'static, str> {
        if let Some(info) = self.get(oid) {
            return info.name.into();
        }
        match self.types.iter().find(|e| e.array_oid == oid) {
            Some(info) => format!("{}[]", info.name).into(),
            None => format!("oid({oid})").into(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn array_mapping_is_total() {
        let table = TypeTable::builtin();
        for info in table.types {
            assert_eq!(table.array_of(info.oid), Some(info.array_oid));
            assert_eq!(table.element_of(info.array_oid), Some(info.oid));
        }
    }

    #[test]
    fn type_names() {
        let table = TypeTable::builtin();
        assert_eq!(table.name(oid::INT4), "int4");
        assert_eq!(table.name(oid::INT4_ARRAY), "int4[]");
        assert_eq!(table.name(9999), "oid(9999)");
        assert!(table.is_array(oid::JSONB_ARRAY));
        assert!(!table.is_array(oid::JSONB));
    }
}
