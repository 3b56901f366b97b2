// Adapters layer: concrete implementations for the reader, the result sink and the notifier.

pub mod csv_sink;
pub mod reader;
pub mod telegram;

pub use csv_sink::CsvSink;
pub use reader::DomainReader;
pub use telegram::TelegramNotifier;
