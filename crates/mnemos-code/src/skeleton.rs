//! Textual project skeleton (spec.md §4.C10 step 8, §6
//! `code/scripts_skeleton.txt`): a module -> class -> method tree used as
//! a cheap whole-project overview, plus a targeted view over a subset of
//! modules for [`crate::rag::CodeSubsystem::skeleton_for`].

use mnemos_core::prelude::ProjectArchitecture;

fn is_empty_init(path: &str, module: &mnemos_core::prelude::ModuleInfo) -> bool {
    path.ends_with("__init__.py") && module.classes.is_empty() && module.functions.is_empty() && module.docstring.is_none()
}

fn render_module(path: &str, module: &mnemos_core::prelude::ModuleInfo, out: &mut String) {
    out.push_str(path);
    out.push('\n');
    if let Some(doc) = &module.docstring {
        out.push_str("    \"\"\" ");
        out.push_str(doc);
        out.push_str(" \"\"\"\n");
    }
    let mut functions: Vec<_> = module.functions.keys().collect();
    functions.sort();
    for name in functions {
        let func = &module.functions[name];
        out.push_str("    ");
        out.push_str(&func.signature);
        out.push('\n');
    }
    let mut classes: Vec<_> = module.classes.keys().collect();
    classes.sort();
    for class_name in classes {
        let class = &module.classes[class_name];
        out.push_str("    class ");
        out.push_str(class_name);
        if !class.bases.is_empty() {
            out.push('(');
            out.push_str(&class.bases.join(", "));
            out.push(')');
        }
        out.push('\n');
        let mut methods: Vec<_> = class.methods.keys().collect();
        methods.sort();
        for method_name in methods {
            let method = &class.methods[method_name];
            out.push_str("        ");
            out.push_str(&method.signature);
            out.push('\n');
        }
    }
    out.push('\n');
}

/// Full whole-project skeleton (spec.md §4.C10 step 8). Empty
/// `__init__.py` modules are omitted as noise.
#[must_use]
pub fn full_skeleton(architecture: &ProjectArchitecture) -> String {
    let mut paths: Vec<_> = architecture.modules.keys().collect();
    paths.sort();
    let mut out = String::new();
    for path in paths {
        let module = &architecture.modules[path];
        if is_empty_init(path, module) {
            continue;
        }
        render_module(path, module, &mut out);
    }
    out
}

/// Partial skeleton restricted to the named modules (spec.md §4.C10:
/// "`_generer_squelette_partiel` -> `skeleton_for(modules)`"), used when a
/// question names specific files rather than asking about the whole
/// project.
#[must_use]
pub fn skeleton_for(architecture: &ProjectArchitecture, modules: &[String]) -> String {
    let mut out = String::new();
    for path in modules {
        if let Some(module) = architecture.modules.get(path) {
            if is_empty_init(path, module) {
                continue;
            }
            render_module(path, module, &mut out);
        }
    }
    out
}
