//! Format resource values as Kubernetes Quantity strings. CPU rates are
//! decimal quantities at nano scale, memory is binary-SI bytes.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

/// CPU rate in nanocores as a decimal quantity with scale -9, e.g.
/// `1000000000n` for one full core.
pub fn cpu_quantity(nanocores: u64) -> Quantity {
    Quantity(format!("{nanocores}n"))
}

/// Working-set bytes as a binary-SI quantity, using the largest power-of-1024
/// suffix that divides the value evenly.
pub fn memory_quantity(bytes: u64) -> Quantity {
    const SUFFIXES: [&str; 4] = ["Ki", "Mi", "Gi", "Ti"];
    if bytes == 0 {
        return Quantity("0".to_string());
    }
    let mut value = bytes;
    let mut suffix = "";
    for next in SUFFIXES {
        if value % 1024 != 0 {
            break;
        }
        value /= 1024;
        suffix = next;
    }
    Quantity(format!("{value}{suffix}"))
}
