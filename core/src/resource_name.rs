use std::fmt;

/// Fully qualified `package:type/entry` name of a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceName {
    pub package: String,
    pub type_: String,
    pub entry: String,
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.package, self.type_, self.entry)
    }
}

/// Borrowed pieces of a `[package:][type/]entry` string, missing parts are empty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceNameRef<'a> {
    pub package: &'a str,
    pub type_: &'a str,
    pub entry: &'a str,
}

impl<'a> ResourceNameRef<'a> {
    /// Split a resource name, a leading `@` is ignored.
    ///
    /// `None` if a separator is present but the part before it is empty,
    /// like `:string/app_name` or `android:/app_name`.
    pub fn parse(name: &'a str) -> Option<ResourceNameRef<'a>> {
        let name = name.strip_prefix('@').unwrap_or(name);

        let mut package = "";
        let mut type_ = "";
        let mut has_package = false;
        let mut has_type = false;
        let mut start = 0;

        for (i, c) in name.char_indices() {
            if type_.is_empty() && c == '/' {
                has_type = true;
                type_ = &name[start..i];
                start = i + 1;
            } else if package.is_empty() && c == ':' {
                has_package = true;
                package = &name[start..i];
                start = i + 1;
            }
        }

        if (has_package && package.is_empty()) || (has_type && type_.is_empty()) {
            return None;
        }

        Some(ResourceNameRef {
            package,
            type_,
            entry: &name[start..],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name() {
        let name = ResourceNameRef::parse("android:string/ok").unwrap();
        assert_eq!(name.package, "android");
        assert_eq!(name.type_, "string");
        assert_eq!(name.entry, "ok");

        let name = ResourceNameRef::parse("@com.example:attr/colorPrimary").unwrap();
        assert_eq!(name.package, "com.example");
        assert_eq!(name.entry, "colorPrimary");
    }

    #[test]
    fn partial_names() {
        let name = ResourceNameRef::parse("string/ok").unwrap();
        assert_eq!((name.package, name.type_, name.entry), ("", "string", "ok"));

        let name = ResourceNameRef::parse("ok").unwrap();
        assert_eq!((name.package, name.type_, name.entry), ("", "", "ok"));
    }

    #[test]
    fn empty_parts_before_separator() {
        assert_eq!(ResourceNameRef::parse(":string/ok"), None);
        assert_eq!(ResourceNameRef::parse("android:/ok"), None);
    }

    #[test]
    fn display() {
        let name = ResourceName {
            package: "android".to_owned(),
            type_: "style".to_owned(),
            entry: "Theme.Material".to_owned(),
        };
        assert_eq!(name.to_string(), "android:style/Theme.Material");
    }
}
