use dataset_explorer::utils::sanitize_filename;

#[test]
fn test_sanitize_filename() {
    // basic alphanumeric with extension
    assert_eq!(sanitize_filename("caltech101.zip"), "caltech101.zip");

    // directory traversal attempts
    assert_eq!(sanitize_filename("../birds.zip"), "birds.zip");
    assert_eq!(sanitize_filename("foo/bar.zip"), "foobar.zip");
    assert_eq!(sanitize_filename("/etc/passwd"), "etcpasswd");
    assert_eq!(sanitize_filename(".."), "");

    // special characters
    assert_eq!(sanitize_filename("101_Object-Categories.zip"), "101_Object-Categories.zip");
    assert_eq!(sanitize_filename("my dataset (v2).zip"), "mydatasetv2.zip");

    // leading dots
    assert_eq!(sanitize_filename(".hidden"), "hidden");
    assert_eq!(sanitize_filename("..hidden"), "hidden");
}
