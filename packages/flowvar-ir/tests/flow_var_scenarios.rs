/*
 * End-to-end scenarios for the flow-variable resolution engine
 *
 * Each test drives the facade the way the outer taint engine would:
 * build a procedure snapshot, resolve it, and inspect the FlowVar set.
 */

use pretty_assertions::assert_eq;

use flowvar_ir::features::cfg::domain::{ArgShape, Argument, ParamShape, TypeShape};
use flowvar_ir::{
    FlowVar, FlowVarOrigin, Procedure, ProcedureBuilder, ResolveFlowVars, ResolverConfig,
};

fn resolve(proc: &Procedure) -> flowvar_ir::FlowVarAnalysis {
    ResolveFlowVars::default().execute(proc).unwrap()
}

/// FlowVars of one variable whose reached uses contain `read`
fn reaching<'a>(
    analysis: &'a flowvar_ir::FlowVarAnalysis,
    var: usize,
    read: usize,
) -> Vec<&'a FlowVar> {
    analysis
        .flow_vars_of(var)
        .filter(|fv| fv.reached_uses.contains(&read))
        .collect()
}

#[test]
fn test_branch_scenario_two_definitions() {
    // x = 0; if (b) { use(x); x = 1; } use(x);
    let mut b = ProcedureBuilder::new("branch");
    let x = b.local("x");
    let s0 = b.sub_block();
    let then = b.sub_block();
    let join = b.sub_block();
    b.edge(s0, then);
    b.edge(s0, join);
    b.edge(then, join);
    let d0 = b.init(s0, x);
    let inner_use = b.read(then, x);
    let d1 = b.assign(then, x);
    let outer_use = b.read(join, x);
    let proc = b.finish().unwrap();

    let analysis = resolve(&proc);
    assert_eq!(analysis.flow_vars_of(x).count(), 2);

    // The use after the branch is reached by both definitions; the use
    // inside the branch only by the initializer.
    let at_inner: Vec<_> = reaching(&analysis, x, inner_use)
        .iter()
        .map(|fv| fv.def_expr)
        .collect();
    assert_eq!(at_inner, vec![Some(d0)]);

    let mut at_outer: Vec<_> = reaching(&analysis, x, outer_use)
        .iter()
        .map(|fv| fv.def_expr)
        .collect();
    at_outer.sort();
    assert_eq!(at_outer, vec![Some(d0), Some(d1)]);
}

#[test]
fn test_uninitialized_read_flagged_on_partial_assignment_paths() {
    // int y; if (c) { y = 5; } return y;
    let mut b = ProcedureBuilder::new("maybe_uninit");
    let y = b.local("y");
    let s0 = b.sub_block();
    let then = b.sub_block();
    let join = b.sub_block();
    b.edge(s0, then);
    b.edge(s0, join);
    b.edge(then, join);
    b.declare(s0, y);
    b.assign(then, y);
    let ret = b.read(join, y);
    let proc = b.finish().unwrap();

    let analysis = resolve(&proc);
    assert!(analysis
        .uninitialized_reads
        .iter()
        .any(|u| u.variable == y && u.read == ret));
    assert!(!analysis.is_ssa_supported(y));

    // The indeterminate initial value surfaces as a FlowVar of its own.
    let initial = analysis
        .flow_vars_of(y)
        .find(|fv| fv.defined_by_initial_value())
        .unwrap();
    assert!(initial.reached_uses.contains(&ret));
    assert_eq!(initial.description, "initial value of y");
}

#[test]
fn test_uninitialized_read_not_flagged_when_every_path_assigns() {
    // int y; if (c) { y = 5; } else { y = 6; } return y;
    let mut b = ProcedureBuilder::new("covered");
    let y = b.local("y");
    let s0 = b.sub_block();
    let then = b.sub_block();
    let els = b.sub_block();
    let join = b.sub_block();
    b.edge(s0, then);
    b.edge(s0, els);
    b.edge(then, join);
    b.edge(els, join);
    b.declare(s0, y);
    b.assign(then, y);
    b.assign(els, y);
    b.read(join, y);
    let proc = b.finish().unwrap();

    let analysis = resolve(&proc);
    assert!(analysis.uninitialized_reads.is_empty());
    assert!(analysis.is_ssa_supported(y));
}

#[test]
fn test_always_entered_loop_shields_pre_loop_definition() {
    // x = 0; while (true-on-entry) { x = f(); } use(x);
    let mut b = ProcedureBuilder::new("skip_loop");
    let x = b.local("x");
    let before = b.sub_block();
    let cond = b.sub_block();
    let body = b.sub_block();
    let after = b.sub_block();
    b.edge(before, cond);
    b.edge(cond, body);
    b.edge(body, cond);
    b.edge(cond, after);
    let d_pre = b.init(before, x);
    let d_loop = b.assign(body, x);
    let post_use = b.read(after, x);
    b.add_loop(cond, vec![cond, body], vec![(cond, after)], true, false);
    let proc = b.finish().unwrap();

    let analysis = resolve(&proc);
    // Skip-loop subjects are routed to the fallback resolver.
    assert!(!analysis.is_ssa_supported(x));

    let at_post: Vec<_> = reaching(&analysis, x, post_use)
        .iter()
        .map(|fv| fv.def_expr)
        .collect();
    assert_eq!(at_post, vec![Some(d_loop)]);
    assert_ne!(at_post, vec![Some(d_pre)]);
}

#[test]
fn test_field_store_is_partial_not_full_redefinition() {
    // obj = ...; obj.field = 1; use(obj);
    let mut b = ProcedureBuilder::new("field_store");
    let obj = b.local("obj");
    let s0 = b.sub_block();
    let s1 = b.sub_block();
    let s2 = b.sub_block();
    b.edge(s0, s1);
    b.edge(s1, s2);
    let d0 = b.init(s0, obj);
    b.field_store(s1, obj);
    let u = b.read(s2, obj);
    let proc = b.finish().unwrap();

    let analysis = resolve(&proc);
    assert_eq!(analysis.partial_definitions.len(), 1);

    // The prior full definition still reaches past the partial mutation,
    // and the partial definition coexists with it.
    let who = reaching(&analysis, obj, u);
    assert!(who.iter().any(|fv| fv.def_expr == Some(d0)));
    assert!(who.iter().any(|fv| !fv.defined_partially_at().is_empty()));
}

#[test]
fn test_mutable_reference_argument_partial_definition() {
    // x = 0; modify(&x); use(x);
    let mut b = ProcedureBuilder::new("by_ref");
    let x = b.local("x");
    let s0 = b.sub_block();
    let s1 = b.sub_block();
    b.edge(s0, s1);
    b.init(s0, x);
    let call = b.call(
        s1,
        None,
        false,
        vec![Argument {
            shape: ArgShape::AddressOfVar(x),
            param: ParamShape::MutableRef,
        }],
    );
    let u = b.read(s1, x);
    let proc = b.finish().unwrap();

    let analysis = resolve(&proc);
    let pd = &analysis.partial_definitions[0];
    assert_eq!(pd.variable, x);
    assert_eq!(pd.expr, call);

    let by_ref = analysis
        .flow_vars_of(x)
        .find(|fv| fv.defined_by_reference().is_some())
        .unwrap();
    assert!(by_ref.reached_uses.contains(&u));
}

#[test]
fn test_kill_correctness_across_sub_blocks() {
    // A full assignment in a successor stops the pre-assignment value.
    let mut b = ProcedureBuilder::new("kill");
    let x = b.local("x");
    let s0 = b.sub_block();
    let s1 = b.sub_block();
    let s2 = b.sub_block();
    b.edge(s0, s1);
    b.edge(s1, s2);
    let d0 = b.init(s0, x);
    let d1 = b.assign(s1, x);
    let u = b.read(s2, x);
    let proc = b.finish().unwrap();

    let analysis = resolve(&proc);
    let who: Vec<_> = reaching(&analysis, x, u)
        .iter()
        .map(|fv| fv.def_expr)
        .collect();
    assert_eq!(who, vec![Some(d1)]);

    let dead = analysis
        .flow_vars_of(x)
        .find(|fv| fv.def_expr == Some(d0))
        .unwrap();
    assert!(dead.reached_uses.is_empty());
}

#[test]
fn test_explosion_guard_is_conservative_absence_of_data() {
    let mut b = ProcedureBuilder::new("guarded");
    let obj = b.local("obj");
    let s0 = b.sub_block();
    let s1 = b.sub_block();
    b.edge(s0, s1);
    b.init(s0, obj);
    b.field_store(s0, obj); // forces the fallback resolver
    b.read(s1, obj);
    let proc = b.finish().unwrap();

    let uc = ResolveFlowVars::new(ResolverConfig::default().with_explosion_guard_limit(0));
    let analysis = uc.execute(&proc).unwrap();
    assert!(analysis.guarded.contains(&obj));

    // Definition points survive; reach information does not.
    assert!(analysis.flow_vars_of(obj).count() > 0);
    assert!(analysis.flow_vars_of(obj).all(|fv| fv.reached_uses.is_empty()));
}

#[test]
fn test_sizeof_operand_never_counts_as_read() {
    let mut b = ProcedureBuilder::new("sizeof");
    let y = b.local("y");
    let s0 = b.sub_block();
    b.declare(s0, y);
    b.non_evaluated_read(s0, y);
    let proc = b.finish().unwrap();

    let analysis = resolve(&proc);
    assert!(analysis.uninitialized_reads.is_empty());
    for fv in analysis.flow_vars_of(y) {
        assert!(fv.reached_uses.is_empty());
    }
}

#[test]
fn test_constructor_parameter_reaches_field_initializer() {
    let mut b = ProcedureBuilder::constructor("ctor");
    let p = b.param("p");
    let s0 = b.sub_block();
    let field_read = b.field_init_read(p);
    let _ = s0;
    let proc = b.finish().unwrap();

    let analysis = resolve(&proc);
    let initial = analysis
        .flow_vars_of(p)
        .find(|fv| fv.defined_by_initial_value())
        .unwrap();
    assert!(initial.reached_uses.contains(&field_read));
}

#[test]
fn test_reference_typed_variables_use_fallback() {
    let mut b = ProcedureBuilder::new("refs");
    let r = b.local_typed("r", TypeShape::reference());
    let s0 = b.sub_block();
    b.init(s0, r);
    b.read(s0, r);
    let proc = b.finish().unwrap();

    let analysis = resolve(&proc);
    assert!(!analysis.is_ssa_supported(r));
    assert!(analysis
        .flow_vars_of(r)
        .all(|fv| matches!(fv.origin, FlowVarOrigin::Block { .. })));
}

#[test]
fn test_no_flow_var_is_surfaced_twice() {
    let mut b = ProcedureBuilder::new("dedup");
    let x = b.local("x");
    let p = b.param("p");
    let s0 = b.sub_block();
    let s1 = b.sub_block();
    let s2 = b.sub_block();
    b.edge(s0, s1);
    b.edge(s0, s2);
    b.edge(s1, s2);
    b.init(s0, x);
    b.read(s1, p);
    b.assign(s1, x);
    b.read(s2, x);
    b.read(s2, p);
    let proc = b.finish().unwrap();

    let analysis = resolve(&proc);
    let mut seen: Vec<(usize, FlowVarOrigin)> = Vec::new();
    for fv in &analysis.flow_vars {
        let key = (fv.variable, fv.origin);
        assert!(!seen.contains(&key), "duplicate flow var {key:?}");
        seen.push(key);
    }
}

mod partition {
    use super::*;
    use proptest::prelude::*;

    /// Assemble an arbitrary small procedure: a chain of blocks with extra
    /// forward edges and a mix of events on one local and one parameter.
    fn build(
        n_blocks: usize,
        extra_edges: &[(usize, usize)],
        events: &[(usize, u8)],
    ) -> Procedure {
        let mut b = ProcedureBuilder::new("generated");
        let x = b.local("x");
        let p = b.param("p");
        let blocks: Vec<_> = (0..n_blocks).map(|_| b.sub_block()).collect();
        for w in blocks.windows(2) {
            b.edge(w[0], w[1]);
        }
        for &(from, to) in extra_edges {
            let (from, to) = (from % n_blocks, to % n_blocks);
            if from != to {
                b.edge(blocks[from], blocks[to]);
            }
        }
        b.init(blocks[0], x);
        for &(at, kind) in events {
            let sbb = blocks[at % n_blocks];
            match kind % 5 {
                0 => {
                    b.read(sbb, x);
                }
                1 => {
                    b.assign(sbb, x);
                }
                2 => {
                    b.read(sbb, p);
                }
                3 => {
                    b.field_store(sbb, x);
                }
                _ => {
                    b.non_evaluated_read(sbb, x);
                }
            }
        }
        b.finish().unwrap()
    }

    proptest! {
        /// Every variable is handled by exactly one resolver, and the
        /// classification is deterministic across runs.
        #[test]
        fn prop_resolver_partition_is_total_and_deterministic(
            n_blocks in 1usize..6,
            extra_edges in proptest::collection::vec((0usize..6, 0usize..6), 0..4),
            events in proptest::collection::vec((0usize..6, 0u8..=255), 0..10),
        ) {
            let proc = build(n_blocks, &extra_edges, &events);
            let uc = ResolveFlowVars::default();
            let a1 = uc.execute(&proc).unwrap();
            let a2 = uc.execute(&proc).unwrap();

            prop_assert_eq!(a1.ssa_supported.clone(), a2.ssa_supported.clone());
            prop_assert_eq!(a1.flow_vars.len(), a2.flow_vars.len());

            for fv in &a1.flow_vars {
                let ssa_backed = matches!(fv.origin, FlowVarOrigin::Ssa { .. });
                prop_assert_eq!(ssa_backed, a1.is_ssa_supported(fv.variable));
            }
        }

        /// Reached uses only ever name reads of the same variable.
        #[test]
        fn prop_reached_uses_are_reads_of_the_same_variable(
            n_blocks in 1usize..6,
            extra_edges in proptest::collection::vec((0usize..6, 0usize..6), 0..4),
            events in proptest::collection::vec((0usize..6, 0u8..=255), 0..10),
        ) {
            let proc = build(n_blocks, &extra_edges, &events);
            let analysis = ResolveFlowVars::default().execute(&proc).unwrap();
            for fv in &analysis.flow_vars {
                for &u in &fv.reached_uses {
                    prop_assert_eq!(proc.expr(u).kind.read_of(), Some(fv.variable));
                }
            }
        }
    }
}
