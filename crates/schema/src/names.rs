//! Type-name helpers.
//!
//! Schema records name member types as C++ spellings (`Int_t`,
//! `vector<double>`, `TH1F*`). These helpers map spellings onto
//! [`BasicType`] and split template arguments.

use crate::kind::BasicType;

/// How an object type name is read when it appears as a pointer target or
/// container element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
    /// String classes: one length-prefixed string
    String,
    /// `TArray*` classes: u32 count then that many scalars
    Numeric(BasicType),
    /// Anything else goes through the class decoder
    NotArray,
}

/// Basic type named by a C++ spelling, if it is one
pub fn type_id_of(name: &str) -> Option<BasicType> {
    use BasicType::*;
    Some(match name {
        "bool" | "Bool_t" => Bool,
        "char" | "signed char" | "Char_t" => Char,
        "short" | "Short_t" | "Color_t" | "Style_t" | "Width_t" => Short,
        "int" | "Int_t" | "EErrorType" => Int,
        "long" | "Long_t" => Long,
        "float" | "Float_t" => Float,
        "double" | "Double_t" => Double,
        "unsigned char" | "UChar_t" => UChar,
        "unsigned short" | "UShort_t" => UShort,
        "unsigned" | "unsigned int" | "UInt_t" => UInt,
        "unsigned long" | "ULong_t" => ULong,
        "int64_t" | "long long" | "Long64_t" => Long64,
        "uint64_t" | "unsigned long long" | "ULong64_t" => ULong64,
        "Double32_t" => Double32,
        "Float16_t" => Float16,
        "char*" | "const char*" | "const Char_t*" => CharStar,
        _ => return None,
    })
}

/// Classify a class name for pointer and element reads
pub fn array_kind(name: &str) -> ArrayKind {
    match name {
        "TString" | "string" | "std::string" => ArrayKind::String,
        "TArrayI" => ArrayKind::Numeric(BasicType::Int),
        "TArrayD" => ArrayKind::Numeric(BasicType::Double),
        "TArrayF" => ArrayKind::Numeric(BasicType::Float),
        "TArrayS" => ArrayKind::Numeric(BasicType::Short),
        "TArrayC" => ArrayKind::Numeric(BasicType::Char),
        "TArrayL" => ArrayKind::Numeric(BasicType::Long),
        "TArrayL64" => ArrayKind::Numeric(BasicType::Long64),
        _ => ArrayKind::NotArray,
    }
}

/// Strip one trailing `*` (and surrounding blanks); returns whether one was found
pub fn strip_pointer(name: &str) -> (&str, bool) {
    let trimmed = name.trim_end();
    match trimmed.strip_suffix('*') {
        Some(rest) => (rest.trim_end(), true),
        None => (trimmed, false),
    }
}

/// Split `outer<args>` into `("outer", "args")`
///
/// The outer name is taken up to the first `<`, the arguments up to the
/// last `>`.
pub fn split_template(name: &str) -> Option<(&str, &str)> {
    let open = name.find('<')?;
    let close = name.rfind('>')?;
    if close <= open {
        return None;
    }
    Some((name[..open].trim(), name[open + 1..close].trim()))
}

/// Split template arguments at top-level commas
pub fn template_args(args: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in args.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            ',' if depth == 0 => {
                out.push(args[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = args[start..].trim();
    if !last.is_empty() {
        out.push(last);
    }
    out
}

/// Name of the pair class stored by a map, e.g. `map<int,double>` gives
/// `pair<int,double>`
pub fn pair_type_for_map(map_type: &str) -> Option<String> {
    let (_, args) = split_template(map_type)?;
    Some(format!("pair<{}>", args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_id_aliases() {
        assert_eq!(type_id_of("Int_t"), Some(BasicType::Int));
        assert_eq!(type_id_of("Color_t"), Some(BasicType::Short));
        assert_eq!(type_id_of("unsigned long long"), Some(BasicType::ULong64));
        assert_eq!(type_id_of("const char*"), Some(BasicType::CharStar));
        assert_eq!(type_id_of("TH1F"), None);
    }

    #[test]
    fn test_array_kind() {
        assert_eq!(array_kind("TString"), ArrayKind::String);
        assert_eq!(array_kind("TArrayD"), ArrayKind::Numeric(BasicType::Double));
        assert_eq!(array_kind("TArrayL64"), ArrayKind::Numeric(BasicType::Long64));
        assert_eq!(array_kind("TArrayX"), ArrayKind::NotArray);
        assert_eq!(array_kind("TAxis"), ArrayKind::NotArray);
    }

    #[test]
    fn test_template_splitting() {
        let (outer, args) = split_template("map<int,vector<pair<int,float> > >").unwrap();
        assert_eq!(outer, "map");
        assert_eq!(
            template_args(args),
            vec!["int", "vector<pair<int,float> >"]
        );
        assert_eq!(split_template("TH1F"), None);
        assert_eq!(
            pair_type_for_map("multimap<TString,int>").as_deref(),
            Some("pair<TString,int>")
        );
    }

    #[test]
    fn test_strip_pointer() {
        assert_eq!(strip_pointer("TH1F*"), ("TH1F", true));
        assert_eq!(strip_pointer("TH1F *"), ("TH1F", true));
        assert_eq!(strip_pointer("TH1F"), ("TH1F", false));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_template_args_rejoin(parts in proptest::collection::vec("[A-Za-z_][A-Za-z0-9_]{0,8}", 1..5)) {
                let args = parts.join(", ");
                prop_assert_eq!(template_args(&args), parts.iter().map(String::as_str).collect::<Vec<_>>());

                let map_type = format!("map<{}>", args);
                prop_assert_eq!(split_template(&map_type), Some(("map", args.as_str())));
            }

            #[test]
            fn prop_nested_args_stay_whole(inner in "[a-z]{1,6}", outer in "[A-Z][a-z]{0,6}") {
                let args = format!("{outer}, vector<pair<{inner},{inner}>>");
                let split = template_args(&args);
                prop_assert_eq!(split.len(), 2);
                prop_assert_eq!(split[0], outer.as_str());
            }
        }
    }
}
