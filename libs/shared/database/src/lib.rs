pub mod supabase;
pub mod tenancy;

pub use supabase::SupabaseClient;
