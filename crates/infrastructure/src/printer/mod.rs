pub mod file_printer;
pub mod mock_printer;
pub mod usb_printer;

pub use file_printer::FilePrinter;
pub use mock_printer::MockPrinter;
pub use usb_printer::UsbPrinter;
