fn main() {
    // Exposes the `Py_3_*` cfgs so the CPython backend can follow the
    // init-config layout of the interpreter it links against.
    #[cfg(feature = "python")]
    pyo3_build_config::use_pyo3_cfgs();
}
