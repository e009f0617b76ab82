//! Order numbers: `ORD-YYYYMMDD-XXXXXXXX`.

use jiff::civil::Date;
use rand::Rng;

/// Upper-case letters and digits without the look-alikes `I`, `O`, `0`, `1`.
pub const ORDER_NUMBER_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const ORDER_NUMBER_SUFFIX_LEN: usize = 8;

/// Insert attempts before giving up on finding an unused number.
pub const MAX_ORDER_NUMBER_ATTEMPTS: usize = 5;

#[must_use]
pub fn generate_order_number<R: Rng + ?Sized>(rng: &mut R, date: Date) -> String {
    let suffix: String = (0..ORDER_NUMBER_SUFFIX_LEN)
        .map(|_| {
            let index = rng.gen_range(0..ORDER_NUMBER_ALPHABET.len());

            char::from(ORDER_NUMBER_ALPHABET[index])
        })
        .collect();

    format!("ORD-{}-{suffix}", date.strftime("%Y%m%d"))
}
