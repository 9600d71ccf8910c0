pub fn setup() {
    // Colored backtraces, printed to stderr
    color_backtrace::install();
}
