use rust_decimal::Decimal;

pub fn write_csv<I, R, W>(records: I, writer: W) -> Result<(), csv::Error>
where
    I: IntoIterator<Item = R>,
    R: serde::Serialize,
    W: std::io::Write,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Quantity with at most 8 decimals and no trailing zeros.
pub fn format_quantity(qty: Decimal) -> String {
    let s = format!("{:.8}", qty);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

pub fn format_money(amount: Decimal) -> String {
    format!("{:.2}", amount)
}

pub fn format_signed(amount: Decimal) -> String {
    if amount > Decimal::ZERO {
        format!("+{:.2}", amount)
    } else {
        format!("{:.2}", amount)
    }
}
