pub mod failed_record;
