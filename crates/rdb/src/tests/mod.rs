mod loader_tests;
mod primitive_tests;
