pub mod dwh;
