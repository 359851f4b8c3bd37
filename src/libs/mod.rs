pub mod canvas;
pub mod channel;
pub mod color;
pub mod coordinator;
pub mod ensemble;
pub mod error;
pub mod io;
pub mod locus;
pub mod record;
pub mod service;
pub mod viewer;
pub mod worker;
