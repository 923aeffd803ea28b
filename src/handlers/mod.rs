pub mod auth;
pub mod data_mustahik;
pub mod grafik;
pub mod laporan;
pub mod records;
pub mod users;
pub mod verifikasi;
