//! Predeclared Go identifiers that never need package qualification.

use phf::phf_set;

static PREDECLARED: phf::Set<&'static str> = phf_set! {
    "int",
    "int8",
    "int16",
    "int32",
    "int64",
    "uint",
    "uint8",
    "uint16",
    "uint32",
    "uint64",
    "uintptr",
    "float32",
    "float64",
    "complex64",
    "complex128",
    "byte",
    "rune",
    "string",
    "bool",
    "error",
    "any",
    "comparable",
};

/// Whether `name` is a predeclared type identifier.
pub fn is_scalar(name: &str) -> bool {
    PREDECLARED.contains(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars() {
        assert!(is_scalar("int"));
        assert!(is_scalar("error"));
        assert!(is_scalar("any"));
        assert!(!is_scalar("File"));
        assert!(!is_scalar("T"));
    }
}
