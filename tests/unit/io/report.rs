//! Tests for CSV report output

#[cfg(test)]
mod tests {
    use visual_complexity::Result;
    use visual_complexity::algorithm::executor::ImageRecord;
    use visual_complexity::algorithm::registry::MeasureResult;
    use visual_complexity::io::report::{ReportWriter, STDOUT_DESTINATION, format_value};

    fn record(image: &str, values: &[(&str, f64)]) -> ImageRecord {
        ImageRecord {
            image: image.to_owned(),
            results: values
                .iter()
                .map(|&(name, value)| MeasureResult {
                    name: name.to_owned(),
                    value,
                })
                .collect(),
        }
    }

    fn columns() -> Vec<String> {
        vec!["fourier_energy".to_owned(), "fourier_energy_grad".to_owned()]
    }

    // Tests undefined values are written as NaN
    // Verified by writing Rust's default float formatting
    #[test]
    fn test_format_value() {
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(1.5), "1.5");
        assert_eq!(format_value(f64::NEG_INFINITY), "-inf");
    }

    // Tests the header and rows are written in order
    // Verified by omitting the image column from the header
    #[test]
    fn test_report_rows() -> Result<()> {
        let mut buffer = Vec::new();
        let mut report = ReportWriter::new(&mut buffer, STDOUT_DESTINATION, columns())?;
        assert_eq!(report.columns(), columns().as_slice());
        assert_eq!(report.destination().to_str(), Some("-"));
        report.write_record(&record(
            "a.png",
            &[("fourier_energy", 0.25), ("fourier_energy_grad", f64::NAN)],
        ))?;
        report.write_record(&record(
            "dir, with comma/b.png",
            &[("fourier_energy", 2.0), ("fourier_energy_grad", 3.0)],
        ))?;
        report.finish()?;

        let text = String::from_utf8(buffer).expect("utf-8 report");
        assert_eq!(
            text,
            "image,fourier_energy,fourier_energy_grad\n\
             a.png,0.25,NaN\n\
             \"dir, with comma/b.png\",2,3\n"
        );
        Ok(())
    }

    // Tests records that disagree with the header are refused
    // Verified by writing records without checking their columns
    #[test]
    fn test_report_rejects_mismatched_record() -> Result<()> {
        let mut buffer = Vec::new();
        let mut report = ReportWriter::new(&mut buffer, "out.csv", columns())?;
        let swapped = record(
            "a.png",
            &[("fourier_energy_grad", 1.0), ("fourier_energy", 1.0)],
        );
        assert!(report.write_record(&swapped).is_err());
        let short = record("a.png", &[("fourier_energy", 1.0)]);
        assert!(report.write_record(&short).is_err());
        report.finish()?;
        assert_eq!(buffer.iter().filter(|&&byte| byte == b'\n').count(), 1);
        Ok(())
    }
}
