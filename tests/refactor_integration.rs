//! End-to-end merging over real Python sources: parse, build the clone
//! class, refactor, render, and compare the rewritten text byte for byte.

use paramerge::ast::parse::parse_source;
use paramerge::ast::{FileId, SourceTree};
use paramerge::refactor::{Clone, CloneClass, RefactorOutcome, SkipReason};
use pretty_assertions::assert_eq;

fn parse_files(sources: &[&str]) -> (SourceTree, Vec<FileId>) {
    let mut tree = SourceTree::new();
    let files = sources
        .iter()
        .enumerate()
        .map(|(i, src)| parse_source(&mut tree, format!("test_file_{i}.py").into(), src).unwrap())
        .collect();
    (tree, files)
}

fn class_over(tree: &SourceTree, files: &[FileId]) -> CloneClass {
    let clones: Vec<Clone> = files
        .iter()
        .flat_map(|file| tree.functions_with_parents(*file))
        .map(|(node, parent)| Clone::from_function(tree, node, parent).unwrap())
        .collect();
    CloneClass::new(1, clones)
}

fn merge_single_file(src: &str) -> String {
    let (mut tree, files) = parse_files(&[src]);
    let mut class = class_over(&tree, &files);
    let outcome = class.refactor(&mut tree).unwrap();
    assert!(matches!(outcome, RefactorOutcome::Merged { .. }));
    tree.rendered(files[0]).unwrap()
}

#[test]
fn literal_divergences_become_constants() {
    let rendered = merge_single_file(
        "def test_add():\n    \
             result = add(2, 3)\n    \
             assert result == 5\n\
         \n\n\
         def test_add_more():\n    \
             result = add(10, 3)\n    \
             assert result == 13\n",
    );
    assert_eq!(
        rendered,
        "@pytest.mark.parametrize(\"parametrized_constant_0, parametrized_constant_1\", \
         [(2, 5), (10, 13)])\n\
         def test_add_parametrized(parametrized_constant_0, parametrized_constant_1):\n    \
             result = add(parametrized_constant_0, 3)\n    \
             assert result == parametrized_constant_1\n\n\n"
    );
}

#[test]
fn repeated_divergence_reuses_one_placeholder() {
    let rendered = merge_single_file(
        "def test_one():\n    \
             assert g(a, a) == 1\n\
         \n\n\
         def test_two():\n    \
             assert g(b, b) == 2\n",
    );
    assert_eq!(
        rendered,
        "@pytest.mark.parametrize(\"parametrized_name_0, parametrized_constant_0\", \
         [(a, 1), (b, 2)])\n\
         def test_one_parametrized(parametrized_name_0, parametrized_constant_0):\n    \
             assert g(parametrized_name_0, parametrized_name_0) == parametrized_constant_0\n\n\n"
    );
}

#[test]
fn divergent_local_names_are_not_parametrized() {
    let rendered = merge_single_file(
        "def test_one():\n    \
             res = f(2)\n    \
             assert res == 4\n\
         \n\n\
         def test_two():\n    \
             out = f(3)\n    \
             assert out == 9\n",
    );
    // `res`/`out` is a local binding; only the literals move into the
    // annotation and the target keeps its own name.
    assert_eq!(
        rendered,
        "@pytest.mark.parametrize(\"parametrized_constant_0, parametrized_constant_1\", \
         [(2, 4), (3, 9)])\n\
         def test_one_parametrized(parametrized_constant_0, parametrized_constant_1):\n    \
             res = f(parametrized_constant_0)\n    \
             assert res == parametrized_constant_1\n\n\n"
    );
}

#[test]
fn clones_differing_only_in_local_names_are_skipped_untouched() {
    let src = "def test_one():\n    \
                   res = f(2)\n    \
                   assert res == 4\n\
               \n\n\
               def test_two():\n    \
                   out = f(2)\n    \
                   assert out == 4\n";
    let (mut tree, files) = parse_files(&[src]);
    let mut class = class_over(&tree, &files);
    let outcome = class.refactor(&mut tree).unwrap();
    assert!(matches!(
        outcome,
        RefactorOutcome::Skipped(SkipReason::NothingToExtract)
    ));
    assert_eq!(tree.rendered(files[0]).unwrap(), src);
}

#[test]
fn three_clones_concatenate_rows_in_order() {
    let rendered = merge_single_file(
        "def test_p():\n    \
             assert h(1) == 1\n\
         \n\n\
         def test_q():\n    \
             assert h(2) == 4\n\
         \n\n\
         def test_r():\n    \
             assert h(3) == 9\n",
    );
    assert_eq!(
        rendered,
        "@pytest.mark.parametrize(\"parametrized_constant_0, parametrized_constant_1\", \
         [(1, 1), (2, 4), (3, 9)])\n\
         def test_p_parametrized(parametrized_constant_0, parametrized_constant_1):\n    \
             assert h(parametrized_constant_0) == parametrized_constant_1\n\n\n"
    );
}

#[test]
fn attribute_member_divergence_is_left_in_place() {
    let rendered = merge_single_file(
        "def test_add_op():\n    \
             calc = Calculator()\n    \
             assert calc.add(2, 3) == 5\n\
         \n\n\
         def test_sub_op():\n    \
             calc = Calculator()\n    \
             assert calc.subtract(2, 3) == 1\n",
    );
    // The differing member is reported, not extracted; the target's own
    // member survives the merge.
    assert_eq!(
        rendered,
        "@pytest.mark.parametrize(\"parametrized_constant_0\", [5, 1])\n\
         def test_add_op_parametrized(parametrized_constant_0):\n    \
             calc = Calculator()\n    \
             assert calc.add(2, 3) == parametrized_constant_0\n\n\n"
    );
}

#[test]
fn cross_file_clone_is_detached_from_its_own_file() {
    let (mut tree, files) = parse_files(&[
        "def test_a():\n    assert f(1) == 2\n",
        "def test_b():\n    assert f(3) == 4\n",
    ]);
    let mut class = class_over(&tree, &files);
    let outcome = class.refactor(&mut tree).unwrap();
    assert!(matches!(outcome, RefactorOutcome::Merged { .. }));

    assert_eq!(
        tree.rendered(files[0]).unwrap(),
        "@pytest.mark.parametrize(\"parametrized_constant_0, parametrized_constant_1\", \
         [(1, 2), (3, 4)])\n\
         def test_a_parametrized(parametrized_constant_0, parametrized_constant_1):\n    \
             assert f(parametrized_constant_0) == parametrized_constant_1\n"
    );
    assert!(tree.is_modified(files[1]));
    assert_eq!(tree.rendered(files[1]).unwrap(), "");
}

#[test]
fn re_extracted_pre_existing_argument_is_folded_in() {
    let rendered = merge_single_file(
        "@pytest.mark.parametrize('x', [1, 2])\n\
         def test_one(x):\n    \
             assert f(x) == 5\n\
         \n\n\
         def test_two(x):\n    \
             assert f(y) == 6\n",
    );
    // `x` is re-extracted as a placeholder value, so its value list is
    // spliced into the placeholder's and its formal parameter goes away.
    assert_eq!(
        rendered,
        "@pytest.mark.parametrize(\"parametrized_name_0, parametrized_constant_0\", \
         [(1, 5), (2, 5), (y, 6)])\n\
         def test_one_parametrized(parametrized_name_0, parametrized_constant_0):\n    \
             assert f(parametrized_name_0) == parametrized_constant_0\n\n\n"
    );
}

#[test]
fn retained_pre_existing_argument_keeps_its_rows() {
    let rendered = merge_single_file(
        "@pytest.mark.parametrize('x', [1, 2])\n\
         def test_one(x):\n    \
             assert f(x) == 10\n\
         \n\n\
         def test_two(x):\n    \
             assert f(x) == 20\n",
    );
    assert_eq!(
        rendered,
        "@pytest.mark.parametrize(\"x, parametrized_constant_0\", \
         [(1, 10), (2, 10), (x, 20)])\n\
         def test_one_parametrized(x, parametrized_constant_0):\n    \
             assert f(x) == parametrized_constant_0\n\n\n"
    );
}

#[test]
fn argument_spliced_in_one_clone_keeps_its_parameter_when_another_retains_it() {
    let rendered = merge_single_file(
        "@pytest.mark.parametrize('x', [1, 2])\n\
         def test_one(x):\n    \
             assert f(x, a) == 9\n\
         \n\n\
         @pytest.mark.parametrize('x', [3])\n\
         def test_two(x):\n    \
             assert f(x, x) == 9\n",
    );
    // `x` is folded into the placeholder for the second clone but stays a
    // plain argument of the first, so it must remain in the signature.
    assert_eq!(
        rendered,
        "@pytest.mark.parametrize(\"x, parametrized_name_0\", \
         [(1, a), (2, a), (x, 3)])\n\
         def test_one_parametrized(x, parametrized_name_0):\n    \
             assert f(x, parametrized_name_0) == 9\n\n\n"
    );
}

#[test]
fn second_refactor_call_changes_nothing() {
    let src = "def test_one():\n    assert f(1) == 2\n\n\n\
               def test_two():\n    assert f(3) == 4\n";
    let (mut tree, files) = parse_files(&[src]);
    let mut class = class_over(&tree, &files);
    class.refactor(&mut tree).unwrap();
    let first = tree.rendered(files[0]).unwrap();

    let outcome = class.refactor(&mut tree).unwrap();
    assert!(matches!(outcome, RefactorOutcome::AlreadyMerged));
    assert_eq!(tree.rendered(files[0]).unwrap(), first);
}
