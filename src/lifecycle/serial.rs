/// Format a generated-letter serial number: `{NNN}/SK/{tenant_code}/{year}`.
///
/// The sequence is zero-padded to three digits; larger values keep all
/// their digits.
pub fn format_serial_number(sequence: u64, tenant_code: &str, year: i32) -> String {
    format!("{:03}/SK/{}/{:04}", sequence, tenant_code, year)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        assert_eq!(format_serial_number(1, "school-1", 2025), "001/SK/school-1/2025");
        assert_eq!(format_serial_number(42, "school-1", 2025), "042/SK/school-1/2025");
        assert_eq!(format_serial_number(1234, "school-1", 2025), "1234/SK/school-1/2025");
    }
}
