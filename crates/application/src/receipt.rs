use chrono::{DateTime, TimeZone};

use domain::printer::{Alignment, TextStyle};

pub const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

pub fn format_timestamp<Tz: TimeZone>(time: DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptKind {
    Count,
    Test,
}

impl ReceiptKind {
    pub fn success_message(self) -> &'static str {
        match self {
            ReceiptKind::Count => "Struk berhasil dicetak.",
            ReceiptKind::Test => "Test print berhasil.",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptLine {
    pub text: String,
    pub style: TextStyle,
}

/// The formatted text payload of one print job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Receipt {
    lines: Vec<ReceiptLine>,
}

impl Receipt {
    pub fn builder() -> ReceiptBuilder {
        ReceiptBuilder::default()
    }

    pub fn lines(&self) -> &[ReceiptLine] {
        &self.lines
    }
}

#[derive(Default)]
pub struct ReceiptBuilder {
    lines: Vec<ReceiptLine>,
}

impl ReceiptBuilder {
    pub fn line(mut self, text: impl Into<String>, style: TextStyle) -> Self {
        self.lines.push(ReceiptLine {
            text: text.into(),
            style,
        });
        self
    }

    pub fn title(self, text: impl Into<String>) -> Self {
        self.line(text, TextStyle::title())
    }

    pub fn separator(self) -> Self {
        self.line("-------------------------", TextStyle::default())
    }

    pub fn blank(self) -> Self {
        self.line("", TextStyle::default())
    }

    pub fn centered(self, text: impl Into<String>) -> Self {
        self.line(text, TextStyle::centered())
    }

    pub fn emphasized(self, text: impl Into<String>) -> Self {
        self.line(text, TextStyle::emphasized())
    }

    pub fn build(self) -> Receipt {
        Receipt { lines: self.lines }
    }
}

/// Receipt for a counting job: header, timestamp, synthetic order id,
/// the counted total, footer.
pub fn count_receipt(counter: u64, timestamp: &str, order_id: i64) -> Receipt {
    Receipt::builder()
        .title("LAPORAN HITUNGAN")
        .separator()
        .blank()
        .line(format!("Tanggal : {timestamp}"), TextStyle::default())
        .line(format!("Nomor   : #{order_id}"), TextStyle::default())
        .separator()
        .emphasized(format!("Hasil Hitungan : {counter}"))
        .separator()
        .blank()
        .centered("Terima kasih!")
        .centered("Dicetak oleh PrinterPro")
        .blank()
        .build()
}

/// Fixed diagnostic receipt for connection tests.
pub fn test_receipt(timestamp: &str) -> Receipt {
    Receipt::builder()
        .title("TEST PRINT")
        .line("---------------------", TextStyle::default())
        .blank()
        .line(format!("Waktu : {timestamp}"), TextStyle::default())
        .line("Printer: BT-58D", TextStyle::default())
        .line("Status : OK", TextStyle::default())
        .blank()
        .line(
            "Test berhasil!",
            TextStyle {
                align: Alignment::Center,
                emphasis: true,
                double_size: false,
            },
        )
        .blank()
        .build()
}
