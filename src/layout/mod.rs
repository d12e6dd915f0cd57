pub mod archetypes;
