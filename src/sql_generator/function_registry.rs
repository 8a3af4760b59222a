/// Canonical function registry
///
/// Maps canonical function names to SQL Server builtins or operators, with
/// optional argument transformations.
use std::collections::HashMap;

use crate::config::SqlVersion;

use super::fragment::{Fragment, SqlBuilder};

/// How a mapped function is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// `NAME(arg, ...)`
    Call,
    /// `NAME()`
    Niladic,
    /// Arguments joined by the operator in `sql_name`.
    Infix,
    /// Substring-match family lowered to LIKE.
    Like(LikeMatch),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeMatch {
    Contains,
    StartsWith,
    EndsWith,
}

/// Builtin used instead of `sql_name` below a given version.
#[derive(Debug, Clone, Copy)]
pub struct VersionFallback {
    pub before: SqlVersion,
    pub sql_name: &'static str,
}

/// Function mapping entry
#[derive(Clone)]
pub struct FunctionMapping {
    /// Canonical function name (lowercase for lookup)
    pub canonical_name: &'static str,
    /// SQL Server builtin or operator
    pub sql_name: &'static str,
    pub kind: FunctionKind,
    /// Oldest version that supports the mapping at all
    pub min_version: SqlVersion,
    pub fallback: Option<VersionFallback>,
    /// Required argument count, when the builtin or transform fixes one
    pub arity: Option<usize>,
    /// Optional argument transformation over the translated arguments
    pub arg_transform: Option<fn(Vec<Fragment>) -> Vec<Fragment>>,
}

impl FunctionMapping {
    const fn call(canonical_name: &'static str, sql_name: &'static str) -> Self {
        FunctionMapping {
            canonical_name,
            sql_name,
            kind: FunctionKind::Call,
            min_version: SqlVersion::Sql2000,
            fallback: None,
            arity: None,
            arg_transform: None,
        }
    }

    fn with_arity(self, arity: usize) -> Self {
        FunctionMapping {
            arity: Some(arity),
            ..self
        }
    }

    /// Builtin name for the configured version.
    pub fn sql_name_for(&self, version: SqlVersion) -> &'static str {
        match self.fallback {
            Some(fallback) if version < fallback.before => fallback.sql_name,
            _ => self.sql_name,
        }
    }
}

/// Get function mapping for a canonical function name
pub fn get_function_mapping(name: &str) -> Option<FunctionMapping> {
    let fn_lower = name.to_lowercase();
    FUNCTION_MAPPINGS.get(fn_lower.as_str()).cloned()
}

/// SQL Server aggregate for a canonical aggregate name
pub fn get_aggregate_name(name: &str) -> Option<&'static str> {
    let fn_lower = name.to_lowercase();
    AGGREGATE_MAPPINGS.get(fn_lower.as_str()).copied()
}

fn date_part(part: &'static str, args: Vec<Fragment>) -> Vec<Fragment> {
    let mut out = vec![Fragment::from(part)];
    out.extend(args);
    out
}

// Static function mapping table
lazy_static::lazy_static! {
    static ref FUNCTION_MAPPINGS: HashMap<&'static str, FunctionMapping> = {
        let mut m = HashMap::new();

        // ===== STRING MATCHING =====

        for (name, kind) in [
            ("contains", LikeMatch::Contains),
            ("startswith", LikeMatch::StartsWith),
            ("endswith", LikeMatch::EndsWith),
        ] {
            m.insert(name, FunctionMapping {
                kind: FunctionKind::Like(kind),
                ..FunctionMapping::call(name, "LIKE")
            });
        }

        // ===== STRING FUNCTIONS =====

        m.insert("toupper", FunctionMapping::call("toupper", "UPPER").with_arity(1));
        m.insert("tolower", FunctionMapping::call("tolower", "LOWER").with_arity(1));
        m.insert("length", FunctionMapping::call("length", "LEN").with_arity(1));
        m.insert("ltrim", FunctionMapping::call("ltrim", "LTRIM").with_arity(1));
        m.insert("rtrim", FunctionMapping::call("rtrim", "RTRIM").with_arity(1));
        m.insert("substring", FunctionMapping::call("substring", "SUBSTRING"));
        m.insert("replace", FunctionMapping::call("replace", "REPLACE"));
        m.insert("reverse", FunctionMapping::call("reverse", "REVERSE"));
        m.insert("left", FunctionMapping::call("left", "LEFT"));
        m.insert("right", FunctionMapping::call("right", "RIGHT"));

        // trim(x) -> LTRIM(RTRIM(x))
        m.insert("trim", FunctionMapping {
            arg_transform: Some(|args| {
                let mut inner = SqlBuilder::new();
                inner.append("RTRIM(");
                for arg in args {
                    inner.append(arg);
                }
                inner.append(")");
                vec![Fragment::Builder(inner)]
            }),
            ..FunctionMapping::call("trim", "LTRIM").with_arity(1)
        });

        // indexOf(str, target) -> CHARINDEX(target, str) [ARGS SWAPPED!]
        m.insert("indexof", FunctionMapping {
            arg_transform: Some(|mut args| {
                if args.len() == 2 {
                    args.swap(0, 1);
                }
                args
            }),
            ..FunctionMapping::call("indexof", "CHARINDEX").with_arity(2)
        });

        // concat(a, b, ...) -> a + b + ...
        m.insert("concat", FunctionMapping {
            kind: FunctionKind::Infix,
            ..FunctionMapping::call("concat", "+")
        });

        // ===== MATH FUNCTIONS =====

        m.insert("abs", FunctionMapping::call("abs", "ABS"));
        m.insert("ceiling", FunctionMapping::call("ceiling", "CEILING"));
        m.insert("floor", FunctionMapping::call("floor", "FLOOR"));
        m.insert("power", FunctionMapping::call("power", "POWER"));

        // round(x) -> ROUND(x, 0); SQL Server requires the precision argument
        m.insert("round", FunctionMapping {
            arg_transform: Some(|mut args| {
                if args.len() == 1 {
                    args.push(Fragment::from("0"));
                }
                args
            }),
            ..FunctionMapping::call("round", "ROUND")
        });

        // ===== DATETIME FUNCTIONS =====

        m.insert("year", FunctionMapping {
            arg_transform: Some(|args| date_part("year", args)),
            ..FunctionMapping::call("year", "DATEPART").with_arity(1)
        });
        m.insert("month", FunctionMapping {
            arg_transform: Some(|args| date_part("month", args)),
            ..FunctionMapping::call("month", "DATEPART").with_arity(1)
        });
        m.insert("day", FunctionMapping {
            arg_transform: Some(|args| date_part("day", args)),
            ..FunctionMapping::call("day", "DATEPART").with_arity(1)
        });
        m.insert("hour", FunctionMapping {
            arg_transform: Some(|args| date_part("hour", args)),
            ..FunctionMapping::call("hour", "DATEPART").with_arity(1)
        });
        m.insert("minute", FunctionMapping {
            arg_transform: Some(|args| date_part("minute", args)),
            ..FunctionMapping::call("minute", "DATEPART").with_arity(1)
        });
        m.insert("second", FunctionMapping {
            arg_transform: Some(|args| date_part("second", args)),
            ..FunctionMapping::call("second", "DATEPART").with_arity(1)
        });

        // currentDateTime() -> SYSDATETIME(), GETDATE() before 2008
        m.insert("currentdatetime", FunctionMapping {
            kind: FunctionKind::Niladic,
            fallback: Some(VersionFallback {
                before: SqlVersion::Sql2008,
                sql_name: "GETDATE",
            }),
            ..FunctionMapping::call("currentdatetime", "SYSDATETIME")
        });

        m.insert("currentdatetimeoffset", FunctionMapping {
            kind: FunctionKind::Niladic,
            min_version: SqlVersion::Sql2008,
            ..FunctionMapping::call("currentdatetimeoffset", "SYSDATETIMEOFFSET")
        });

        // ===== OTHER =====

        m.insert("newguid", FunctionMapping {
            kind: FunctionKind::Niladic,
            ..FunctionMapping::call("newguid", "NEWID")
        });

        m
    };

    static ref AGGREGATE_MAPPINGS: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("count", "COUNT");
        m.insert("bigcount", "COUNT_BIG");
        m.insert("sum", "SUM");
        m.insert("avg", "AVG");
        m.insert("min", "MIN");
        m.insert("max", "MAX");
        m.insert("stdev", "STDEV");
        m.insert("stdevp", "STDEVP");
        m.insert("var", "VAR");
        m.insert("varp", "VARP");
        m
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let mapping = get_function_mapping("ToUpper").unwrap();
        assert_eq!(mapping.sql_name, "UPPER");
        assert_eq!(mapping.canonical_name, "toupper");
        assert!(get_function_mapping("NoSuchFunction").is_none());
    }

    #[test]
    fn test_like_family() {
        let mapping = get_function_mapping("StartsWith").unwrap();
        assert_eq!(mapping.kind, FunctionKind::Like(LikeMatch::StartsWith));
    }

    #[test]
    fn test_index_of_swaps_arguments() {
        let mapping = get_function_mapping("IndexOf").unwrap();
        let transform = mapping.arg_transform.unwrap();
        let args = transform(vec![Fragment::from("s"), Fragment::from("t")]);
        assert!(matches!(&args[0], Fragment::Text(t) if t == "t"));
        assert_eq!(mapping.arity, Some(2));
    }

    #[test]
    fn test_trim_takes_one_argument() {
        assert_eq!(get_function_mapping("Trim").unwrap().arity, Some(1));
        assert_eq!(get_function_mapping("Concat").unwrap().arity, None);
    }

    #[test]
    fn test_current_datetime_falls_back_before_2008() {
        let mapping = get_function_mapping("CurrentDateTime").unwrap();
        assert_eq!(mapping.sql_name_for(SqlVersion::Sql2005), "GETDATE");
        assert_eq!(mapping.sql_name_for(SqlVersion::Sql2008), "SYSDATETIME");
    }

    #[test]
    fn test_aggregate_names() {
        assert_eq!(get_aggregate_name("BigCount"), Some("COUNT_BIG"));
        assert_eq!(get_aggregate_name("StDevP"), Some("STDEVP"));
        assert_eq!(get_aggregate_name("Median"), None);
    }
}
