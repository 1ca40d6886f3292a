//! 输入组合枚举
//!
//! 为生成器的角色列表枚举所有合法的输入组合（每个角色一个对象）。
//! - 非顺序生成器：各角色候选的笛卡尔积，同一对象不重复使用；
//!   相邻且完全相同的角色按候选索引递增选择，只产生组合而非排列
//! - 顺序生成器：按时间排列的输入池上长度为角色数的滑动窗口

use crate::arena::ObjectArena;
use crate::collection::RelevantObjectCollection;
use crate::generator::{GeneratorId, Role};
use crate::object::{ObjectId, ObjectKind};

/// 一次枚举的参数
pub struct AssignmentQuery<'a> {
    pub generator: GeneratorId,
    pub roles: &'a [Role],
    pub pool: &'a RelevantObjectCollection,
    pub sequential: bool,
}

/// 枚举所有满足角色约束且被 `accept` 接受的组合
pub fn enumerate_assignments<F>(query: &AssignmentQuery<'_>, arena: &ObjectArena, accept: F) -> Vec<Vec<ObjectId>>
where
    F: Fn(&[ObjectId]) -> bool,
{
    if query.roles.is_empty() {
        return Vec::new();
    }
    if query.sequential {
        sequential_windows(query, arena, &accept)
    } else {
        combinations(query, arena, &accept)
    }
}

fn role_accepts(role: &Role, id: ObjectId, generator: GeneratorId, arena: &ObjectArena) -> bool {
    arena
        .get(id)
        .is_some_and(|obj| obj.kind() == role.kind && role.predicates.check(obj, generator))
}

fn sequential_windows<F>(query: &AssignmentQuery<'_>, arena: &ObjectArena, accept: &F) -> Vec<Vec<ObjectId>>
where
    F: Fn(&[ObjectId]) -> bool,
{
    let kinds: Vec<ObjectKind> = query.roles.iter().map(|r| r.kind).collect();
    let sequence = query.pool.time_ordered(&kinds, arena);

    sequence
        .windows(query.roles.len())
        .filter(|window| {
            window
                .iter()
                .zip(query.roles)
                .all(|(id, role)| role_accepts(role, *id, query.generator, arena))
        })
        .filter(|window| accept(window))
        .map(<[ObjectId]>::to_vec)
        .collect()
}

fn combinations<F>(query: &AssignmentQuery<'_>, arena: &ObjectArena, accept: &F) -> Vec<Vec<ObjectId>>
where
    F: Fn(&[ObjectId]) -> bool,
{
    let candidates: Vec<Vec<ObjectId>> = query
        .roles
        .iter()
        .map(|role| {
            query
                .pool
                .bucket(role.kind)
                .iter()
                .copied()
                .filter(|id| role_accepts(role, *id, query.generator, arena))
                .collect()
        })
        .collect();

    if candidates.iter().any(Vec::is_empty) {
        return Vec::new();
    }

    let mut results = Vec::new();
    let mut current = Vec::with_capacity(query.roles.len());
    let mut chosen = Vec::with_capacity(query.roles.len());
    backtrack(query.roles, &candidates, &mut current, &mut chosen, accept, &mut results);
    results
}

fn backtrack<F>(
    roles: &[Role],
    candidates: &[Vec<ObjectId>],
    current: &mut Vec<ObjectId>,
    chosen: &mut Vec<usize>,
    accept: &F,
    results: &mut Vec<Vec<ObjectId>>,
) where
    F: Fn(&[ObjectId]) -> bool,
{
    let slot = current.len();
    if slot == roles.len() {
        if accept(current) {
            results.push(current.clone());
        }
        return;
    }

    // 与上一个角色完全相同时只取更靠后的候选
    let start = if slot > 0 && roles[slot] == roles[slot - 1] {
        chosen[slot - 1] + 1
    } else {
        0
    };

    for index in start..candidates[slot].len() {
        let id = candidates[slot][index];
        if current.contains(&id) {
            continue;
        }
        current.push(id);
        chosen.push(index);
        backtrack(roles, candidates, current, chosen, accept, results);
        chosen.pop();
        current.pop();
    }
}
