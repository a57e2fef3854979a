mod readings;
mod runs;
