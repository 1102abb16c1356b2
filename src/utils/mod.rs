pub mod tier_badge;
