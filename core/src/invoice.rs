//! Invoice numbers: `INV/YYYYMMDD/NNNNN`.

use chrono::NaiveDate;
use rand::Rng;

/// Invoice number for a booking made on `date`.
pub fn random_invoice<R: Rng + ?Sized>(date: NaiveDate, rng: &mut R) -> String {
    let serial: u32 = rng.gen_range(10_000..=99_999);
    format!("INV/{}/{serial}", date.format("%Y%m%d"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn has_date_and_five_digit_serial() {
        let mut rng = StdRng::seed_from_u64(7);
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        let invoice = random_invoice(date, &mut rng);

        let parts: Vec<&str> = invoice.split('/').collect();
        assert_eq!(parts[0], "INV");
        assert_eq!(parts[1], "20250309");
        assert_eq!(parts[2].len(), 5);
        assert!(parts[2].parse::<u32>().is_ok());
    }
}
