pub mod duplex;
