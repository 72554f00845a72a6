//! Evaluator unit tests

use indexmap::IndexMap;
use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{GraphError, Result};
use crate::eval::{evaluate, Environment, Evaluator};
use crate::function::{Callable, Function, Op};
use crate::graph::{Deferred, Domain, Graph, NodeId, Term, VariableSpec};
use crate::util::config::EvalConfig;
use crate::value::{Mapping, MappingKind, Object, Slice, Value};

/// A function returning how many times it has been called.
fn counter(name: &str) -> (Function, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let f = Function::variadic(name, move |_, _| {
        let n = seen.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Value::Int(n as i64))
    });
    (f, calls)
}

fn forbidden() -> Function {
    Function::variadic("forbidden", |_, _| anyhow::bail!("must not be evaluated"))
}

fn eval(
    graph: &Graph,
    root: NodeId,
) -> Result<Value> {
    evaluate(graph, root, &Environment::new())
}

#[cfg(test)]
mod lazy_tests {
    use super::*;

    #[test]
    fn test_lazy_list() {
        let mut graph = Graph::new();
        let (f, calls) = counter("f");
        let list = graph
            .convert(Term::List(vec![
                Deferred::new(f).into(),
                Deferred::new(forbidden()).into(),
                5.into(),
            ]))
            .unwrap();

        let first = graph.get_item(list, 0).unwrap();
        assert_eq!(eval(&graph, first).unwrap(), Value::Int(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let last = graph.get_item(list, -1).unwrap();
        assert_eq!(eval(&graph, last).unwrap(), Value::Int(5));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lazy_tuple_with_computed_index() {
        let mut graph = Graph::new();
        let tuple = graph
            .convert(Term::Tuple(vec![
                Deferred::new(forbidden()).into(),
                "picked".into(),
                Deferred::new(forbidden()).into(),
            ]))
            .unwrap();
        let index = graph.sub(3, 2).unwrap();
        let item = graph.get_item(tuple, index).unwrap();
        assert_eq!(eval(&graph, item).unwrap(), Value::str("picked"));
    }

    #[test]
    fn test_index_out_of_range() {
        let mut graph = Graph::new();
        let list = graph.convert(Term::List(vec![1.into(), 2.into()])).unwrap();
        let item = graph.get_item(list, 2).unwrap();
        assert!(matches!(eval(&graph, item), Err(GraphError::IndexOutOfRange { index: 2, len: 2 })));
        let item = graph.get_item(list, "a").unwrap();
        assert!(matches!(eval(&graph, item), Err(GraphError::Operation { op: "getitem", .. })));
    }

    #[test]
    fn test_lazy_slice() {
        let mut graph = Graph::new();
        let list = graph
            .convert(Term::List(vec![
                1.into(),
                Deferred::new(forbidden()).into(),
                3.into(),
                4.into(),
            ]))
            .unwrap();
        let tail = graph.get_item(list, Slice::from_start(2)).unwrap();
        assert_eq!(eval(&graph, tail).unwrap(), Value::List(vec![Value::Int(3), Value::Int(4)]));

        let tuple = graph.convert(Term::Tuple(vec![1.into(), 2.into(), 3.into()])).unwrap();
        let reversed = graph.get_item(tuple, Slice::new(None, None, Some(-1))).unwrap();
        assert_eq!(
            eval(&graph, reversed).unwrap(),
            Value::Tuple(vec![Value::Int(3), Value::Int(2), Value::Int(1)])
        );

        let every_huge = graph.get_item(tuple, Slice::new(Some(1), None, Some(i64::MAX))).unwrap();
        assert_eq!(eval(&graph, every_huge).unwrap(), Value::Tuple(vec![Value::Int(2)]));
    }

    #[test]
    fn test_lazy_dict() {
        for kind in [MappingKind::Dict, MappingKind::Ordered] {
            let mut graph = Graph::new();
            let (f, calls) = counter("f");
            let dict = graph
                .convert(Term::Map(
                    kind,
                    vec![
                        ("a".into(), Deferred::new(f).into()),
                        ("b".into(), Deferred::new(forbidden()).into()),
                        (7.into(), "seven".into()),
                    ],
                ))
                .unwrap();

            let a = graph.get_item(dict, "a").unwrap();
            assert_eq!(eval(&graph, a).unwrap(), Value::Int(1));
            let seven = graph.get_item(dict, 7.0).unwrap();
            assert_eq!(eval(&graph, seven).unwrap(), Value::str("seven"));
            assert_eq!(calls.load(Ordering::SeqCst), 1);

            let missing = graph.get_item(dict, "c").unwrap();
            match eval(&graph, missing) {
                Err(GraphError::KeyNotFound { key }) => assert_eq!(key, Value::str("c")),
                other => panic!("unexpected result {:?}", other),
            }
        }
    }

    #[test]
    fn test_computed_keys_are_not_matched_lazily() {
        let mut graph = Graph::new();
        let dict = graph
            .convert(Term::dict([
                (Deferred::new(forbidden()).into(), 1.into()),
                ("a".into(), 2.into()),
            ]))
            .unwrap();

        let hit = graph.get_item(dict, "a").unwrap();
        assert_eq!(eval(&graph, hit).unwrap(), Value::Int(2));
        let miss = graph.get_item(dict, "z").unwrap();
        assert!(matches!(eval(&graph, miss), Err(GraphError::Construction { .. })));
    }

    #[test]
    fn test_indexing_a_call_result() {
        let mut graph = Graph::new();
        let make = Function::variadic("make", |_, _| Ok(Value::List(vec![Value::Int(1), Value::Int(2)])));
        let call = graph.call(make, vec![]).unwrap();
        let item = graph.get_item(call, -1).unwrap();
        assert!(!graph.is_indexable(item));
        assert_eq!(eval(&graph, item).unwrap(), Value::Int(2));
    }
}

#[cfg(test)]
mod structure_tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        for (a, b) in [(6i64, 5i64), (4, 2), (9, 11)] {
            let mut graph = Graph::new();
            let cases = [
                (graph.add(a, b).unwrap(), Value::Int(a + b)),
                (graph.sub(a, b).unwrap(), Value::Int(a - b)),
                (graph.mul(a, b).unwrap(), Value::Int(a * b)),
                (graph.truediv(a, b).unwrap(), Value::Float(a as f64 / b as f64)),
                (graph.floordiv(a, b).unwrap(), Value::Int(a / b)),
                (graph.modulo(a, b).unwrap(), Value::Int(a % b)),
                (graph.pow(a, b).unwrap(), Value::Int(a.pow(b as u32))),
                (graph.divmod(a, b).unwrap(), Value::Tuple(vec![Value::Int(a / b), Value::Int(a % b)])),
                (graph.bitand(a, b).unwrap(), Value::Int(a & b)),
                (graph.bitor(a, b).unwrap(), Value::Int(a | b)),
                (graph.bitxor(a, b).unwrap(), Value::Int(a ^ b)),
                (graph.lshift(a, b).unwrap(), Value::Int(a << b)),
                (graph.lt(a, b).unwrap(), Value::Bool(a < b)),
                (graph.ge(a, b).unwrap(), Value::Bool(a >= b)),
                (graph.equal(a, b).unwrap(), Value::Bool(a == b)),
                (graph.neg(a).unwrap(), Value::Int(-a)),
                (graph.invert(b).unwrap(), Value::Int(!b)),
            ];
            for (node, expected) in cases {
                assert_eq!(eval(&graph, node).unwrap(), expected, "{}", graph.render(node).unwrap());
            }
        }
    }

    #[test]
    fn test_nested_values() {
        let tuple = Value::Tuple(vec![
            Value::Tuple(vec![Value::Int(3), Value::Int(5)]),
            Value::Int(12),
            Value::Float(9.0),
        ]);
        let list = Value::List(vec![
            Value::List(vec![Value::Int(3), Value::Int(-1)]),
            Value::Int(-2),
            Value::Float(9.0),
        ]);
        let dict = Value::Map(Mapping::from_entries(
            MappingKind::Dict,
            [
                (Value::Int(5), Value::Int(2)),
                (Value::Int(3), Value::Tuple(vec![Value::Int(7), Value::Int(9)])),
                (Value::Int(4), Value::List(vec![Value::Int(1)])),
            ],
        ));

        for value in [tuple, list, dict] {
            let mut graph = Graph::new();
            let root = graph.convert(value.clone()).unwrap();
            assert_eq!(eval(&graph, root).unwrap(), value);
        }
    }

    #[test]
    fn test_nodes_inside_containers() {
        let mut graph = Graph::new();
        let sum = graph.add(1, 2).unwrap();
        let doubled = Deferred::new(Op::Mul).arg(sum).arg(2);
        let root = graph
            .convert(Term::List(vec![sum.into(), Term::Tuple(vec![doubled.into()])]))
            .unwrap();
        assert_eq!(
            eval(&graph, root).unwrap(),
            Value::List(vec![Value::Int(3), Value::Tuple(vec![Value::Int(6)])])
        );
    }

    #[test]
    fn test_ordered_mapping_keeps_its_kind() {
        let mut graph = Graph::new();
        let root = graph
            .convert(Term::Map(MappingKind::Ordered, vec![("b".into(), 1.into()), ("a".into(), 2.into())]))
            .unwrap();
        match eval(&graph, root).unwrap() {
            Value::Map(map) => {
                assert_eq!(map.kind(), MappingKind::Ordered);
                let keys: Vec<_> = map.iter().map(|(k, _)| k.clone()).collect();
                assert_eq!(keys, vec![Value::str("b"), Value::str("a")]);
            }
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_shared_node_yields_one_object() {
        let mut graph = Graph::new();
        let make = Function::variadic("make", |_, _| Ok(Value::Object(Object::new(Vec::<i64>::new()))));
        let obj = graph.call(make, vec![]).unwrap();
        let pair = graph.convert(Term::List(vec![obj.into(), obj.into()])).unwrap();

        let first = match eval(&graph, pair).unwrap() {
            Value::List(items) => {
                let a = items[0].as_object().unwrap();
                let b = items[1].as_object().unwrap();
                assert!(a.ptr_eq(b));
                a.clone()
            }
            other => panic!("unexpected value {:?}", other),
        };

        // a fresh evaluation calls the factory again
        let second = eval(&graph, obj).unwrap();
        assert!(!first.ptr_eq(second.as_object().unwrap()));
    }
}

#[cfg(test)]
mod variable_tests {
    use super::*;

    #[test]
    fn test_substitution() {
        let mut graph = Graph::new();
        let x = graph
            .variable(VariableSpec::new("x", Domain::Values(vec![Value::str("hey")])))
            .unwrap();
        let y = graph.variable(VariableSpec::new("y", Domain::Int)).unwrap();
        let root = graph
            .convert(Term::dict([
                (3.into(), x.into()),
                (x.into(), Term::List(vec![y.into(), Term::List(vec![y.into()])])),
                (y.into(), 4.into()),
            ]))
            .unwrap();
        let env = Environment::new().with("x", "hey").with("y", 5);

        let expected = Mapping::from_entries(
            MappingKind::Dict,
            [
                (Value::Int(3), Value::str("hey")),
                (Value::str("hey"), Value::List(vec![Value::Int(5), Value::List(vec![Value::Int(5)])])),
                (Value::Int(5), Value::Int(4)),
            ],
        );
        assert_eq!(evaluate(&graph, root, &env).unwrap(), Value::Map(expected));

        // only `x` is needed to look up the literal key
        let item = graph.get_item(root, 3).unwrap();
        let partial = Environment::new().with("x", "hey");
        assert_eq!(evaluate(&graph, item, &partial).unwrap(), Value::str("hey"));
    }

    #[test]
    fn test_unbound_variable() {
        let mut graph = Graph::new();
        let x = graph.variable(VariableSpec::new("x", Domain::Float)).unwrap();
        let root = graph.mul(x, 2).unwrap();
        match eval(&graph, root) {
            Err(GraphError::UnboundVariable { name }) => assert_eq!(name, "x"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_only_the_name_is_evaluated() {
        let mut graph = Graph::new();
        let x = graph
            .variable(VariableSpec::new("x", Domain::Float).minimum(0.0).maximum(1.0))
            .unwrap();
        let env = Environment::new().with("x", 0.25).with("unused", 1);
        let mut evaluator = Evaluator::new(&graph, &env);
        assert_eq!(evaluator.evaluate(x).unwrap(), Value::Float(0.25));
        assert_eq!(evaluator.evaluated(), 2);
    }

    #[test]
    fn test_environment() {
        let mut env: Environment = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(env.len(), 2);
        assert_eq!(env.bind("a", 3), Some(Value::Int(1)));
        assert_eq!(env.get("a"), Some(&Value::Int(3)));
        assert_eq!(env.names().collect::<Vec<_>>(), ["a", "b"]);
        assert!(Environment::new().is_empty());
    }
}

#[cfg(test)]
mod choice_tests {
    use super::*;

    #[test]
    fn test_choice_evaluates_selected_alternative() {
        let mut graph = Graph::new();
        let (f, calls) = counter("f");
        let c = graph
            .variable(VariableSpec::new("c", Domain::Values(vec![Value::str("a"), Value::str("b")])))
            .unwrap();
        let choice = graph
            .choice(
                c,
                vec![
                    ("a".into(), Deferred::new(f).into()),
                    ("b".into(), Deferred::new(forbidden()).into()),
                ],
            )
            .unwrap();

        let env = Environment::new().with("c", "a");
        assert_eq!(evaluate(&graph, choice, &env).unwrap(), Value::Int(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let env = Environment::new().with("c", "z");
        assert!(matches!(
            evaluate(&graph, choice, &env),
            Err(GraphError::KeyNotFound { .. })
        ));
    }
}

#[cfg(test)]
mod memo_tests {
    use super::*;

    #[test]
    fn test_shared_call_runs_once() {
        let mut graph = Graph::new();
        let (f, calls) = counter("f");
        let n = graph.call(f, vec![]).unwrap();
        let root = graph.add(n, n).unwrap();
        assert_eq!(eval(&graph, root).unwrap(), Value::Int(2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_evaluator_shares_work_between_roots() {
        let mut graph = Graph::new();
        let (f, calls) = counter("f");
        let n = graph.call(f, vec![]).unwrap();
        let r1 = graph.add(n, 1).unwrap();
        let r2 = graph.mul(n, 10).unwrap();

        let env = Environment::new();
        let mut evaluator = Evaluator::new(&graph, &env);
        assert_eq!(evaluator.evaluate(r1).unwrap(), Value::Int(2));
        assert_eq!(evaluator.evaluate(r2).unwrap(), Value::Int(10));
        assert!(evaluator.is_evaluated(n));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // a separate evaluation starts from an empty memo
        assert_eq!(eval(&graph, r1).unwrap(), Value::Int(3));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

#[cfg(test)]
mod invoke_tests {
    use super::*;

    #[test]
    fn test_hook_sees_general_calls_only() {
        let mut graph = Graph::new();
        let sum = graph.add(1, 2).unwrap();
        let list = graph.convert(Term::List(vec![sum.into(), 5.into()])).unwrap();
        let item = graph.get_item(list, 0).unwrap();

        let calls = RefCell::new(Vec::new());
        let env = Environment::new();
        let mut evaluator = Evaluator::new(&graph, &env).with_invoker(
            |node: NodeId, callable: &Callable, args: &[Value], kwargs: &IndexMap<String, Value>| {
                calls.borrow_mut().push(node);
                callable.invoke(args, kwargs)
            },
        );
        assert_eq!(evaluator.evaluate(item).unwrap(), Value::Int(3));
        drop(evaluator);
        assert_eq!(calls.into_inner(), vec![sum]);
    }

    #[test]
    fn test_hook_replaces_results() {
        let mut graph = Graph::new();
        let boom = graph.call(forbidden(), vec![]).unwrap();
        let root = graph.add(boom, 1).unwrap();

        let env = Environment::new();
        let mut evaluator = Evaluator::new(&graph, &env).with_invoker(
            |node: NodeId, callable: &Callable, args: &[Value], kwargs: &IndexMap<String, Value>| -> Result<Value> {
                if node == boom {
                    Ok(Value::Int(41))
                } else {
                    callable.invoke(args, kwargs)
                }
            },
        );
        assert_eq!(evaluator.evaluate(root).unwrap(), Value::Int(42));
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn test_function_error_passes_through() {
        let mut graph = Graph::new();
        let boom = graph.call(forbidden(), vec![]).unwrap();
        let root = graph.convert(Term::List(vec![boom.into()])).unwrap();
        match eval(&graph, root) {
            Err(GraphError::Function(err)) => assert_eq!(err.to_string(), "must not be evaluated"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_huge_repetition_is_an_error() {
        let mut graph = Graph::new();
        let pair = graph.convert(Term::List(vec![1.into(), 2.into()])).unwrap();
        let repeated = graph.mul(pair, i64::MAX).unwrap();
        assert!(matches!(eval(&graph, repeated), Err(GraphError::Operation { op: "mul", .. })));
    }

    #[test]
    fn test_depth_limit() {
        let mut graph = Graph::new();
        let mut node = graph.literal(1);
        for _ in 0..20 {
            node = graph.neg(node).unwrap();
        }
        let env = Environment::new();

        let result = Evaluator::new(&graph, &env)
            .with_config(EvalConfig { max_depth: 21 })
            .evaluate(node);
        assert_eq!(result.unwrap(), Value::Int(1));

        let result = Evaluator::new(&graph, &env)
            .with_config(EvalConfig { max_depth: 20 })
            .evaluate(node);
        assert!(matches!(result, Err(GraphError::DepthExceeded { limit: 20 })));
    }

    #[test]
    fn test_cycle_hits_depth_limit() {
        let mut graph = Graph::new();
        let (f, _) = counter("f");
        let node = graph.call(f, vec![]).unwrap();
        graph.append_arg(node, node).unwrap();
        let env = Environment::new();
        let result = Evaluator::new(&graph, &env)
            .with_config(EvalConfig { max_depth: 64 })
            .evaluate(node);
        assert!(matches!(result, Err(GraphError::DepthExceeded { .. })));
    }

    #[test]
    fn test_missing_root() {
        let graph = Graph::new();
        assert!(matches!(eval(&graph, NodeId(0)), Err(GraphError::NodeNotFound(_))));
    }
}

#[cfg(test)]
mod stack_tests {
    use super::*;
    use crate::util::config::DEFAULT_MAX_DEPTH;
    use std::thread;

    /// `n` negations of the literal 1.
    fn neg_chain(n: usize) -> (Graph, NodeId) {
        let mut graph = Graph::with_capacity(n + 1);
        let mut node = graph.literal(1);
        for _ in 0..n {
            node = graph.neg(node).unwrap();
        }
        (graph, node)
    }

    /// Run `f` on a thread with a 2 MiB stack.
    fn on_small_stack<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
        thread::Builder::new()
            .stack_size(2 << 20)
            .spawn(f)
            .unwrap()
            .join()
            .unwrap()
    }

    #[test]
    fn test_default_depth_fits_a_small_stack() {
        let result = on_small_stack(|| {
            let (graph, root) = neg_chain(DEFAULT_MAX_DEPTH - 1);
            evaluate(&graph, root, &Environment::new())
        });
        assert_eq!(result.unwrap(), Value::Int(-1));
    }

    #[test]
    fn test_one_past_default_depth_is_an_error() {
        let result = on_small_stack(|| {
            let (graph, root) = neg_chain(DEFAULT_MAX_DEPTH);
            evaluate(&graph, root, &Environment::new())
        });
        assert!(matches!(result, Err(GraphError::DepthExceeded { limit: DEFAULT_MAX_DEPTH })));
    }

    #[test]
    fn test_raised_limit_is_not_bound_by_the_stack() {
        let result = on_small_stack(|| {
            let (graph, root) = neg_chain(100_000);
            let env = Environment::new();
            let value = Evaluator::new(&graph, &env)
                .with_config(EvalConfig { max_depth: 100_001 })
                .evaluate(root);
            value
        });
        assert_eq!(result.unwrap(), Value::Int(1));
    }

    #[test]
    fn test_wide_node_is_not_deep() {
        let mut graph = Graph::new();
        let items = (0..5_000i64).map(|i| graph.add(i, 1).map(Term::from)).collect::<Result<Vec<_>>>().unwrap();
        let list = graph.convert(Term::List(items)).unwrap();
        let env = Environment::new();
        let value = Evaluator::new(&graph, &env)
            .with_config(EvalConfig { max_depth: 3 })
            .evaluate(list)
            .unwrap();
        assert_eq!(value.as_sequence().map(<[Value]>::len), Some(5_000));
    }
}
