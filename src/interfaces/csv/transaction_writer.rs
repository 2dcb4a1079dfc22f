use crate::domain::payment::{PaymentStatus, TransactionKind, TransactionRecord};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct Row<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: TransactionKind,
    amount: String,
    status: PaymentStatus,
    phone: &'a str,
    created_at: String,
}

/// Writes pool transactions as CSV with a header row.
pub struct TransactionWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> TransactionWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_transactions<I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = TransactionRecord>,
    {
        for record in records {
            self.writer.serialize(Row {
                id: &record.id,
                kind: record.kind,
                amount: record.amount.to_string(),
                status: record.status,
                phone: record.phone.as_deref().unwrap_or_default(),
                created_at: record.created_at.to_rfc3339(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
