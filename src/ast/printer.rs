//! `Display` renderings of the program representation.
//!
//! Expression rendering doubles as the token form of `Index` path segments,
//! so it must stay deterministic: one space around binary operators, nested
//! binary operands parenthesized, nothing evaluated.

use super::nodes::*;
use std::fmt;

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Ident(e) => write!(f, "{}", e.name),
            Expr::Literal(e) => write!(f, "{}", e.value),
            Expr::Field(e) => write!(f, "{}.{}", e.target, e.name),
            Expr::Index(e) => write!(f, "{}[{}]", e.target, e.index),
            Expr::Deref(e) => write!(f, "{}^", e.target),
            Expr::Call(call) => {
                write!(f, "{}(", call.callee)?;
                write_list(f, &call.args)?;
                write!(f, ")")
            }
            Expr::Unary(e) => {
                let op = match e.op {
                    UnaryOp::Not => "!",
                    UnaryOp::Neg => "-",
                };
                match e.operand.as_ref() {
                    Expr::Binary(_) => write!(f, "{}({})", op, e.operand),
                    _ => write!(f, "{}{}", op, e.operand),
                }
            }
            Expr::Binary(e) => {
                write_operand(f, &e.left)?;
                write!(f, " {} ", e.op)?;
                write_operand(f, &e.right)
            }
        }
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr) -> fmt::Result {
    match expr {
        Expr::Binary(_) => write!(f, "({})", expr),
        _ => write!(f, "{}", expr),
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, exprs: &[Expr]) -> fmt::Result {
    for (i, expr) in exprs.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", expr)?;
    }
    Ok(())
}

fn write_block(f: &mut fmt::Formatter<'_>, stmts: &[Stmt], indent: usize) -> fmt::Result {
    writeln!(f, "{{")?;
    for stmt in stmts {
        write_stmt(f, stmt, indent + 1)?;
    }
    write!(f, "{}}}", "    ".repeat(indent))
}

fn write_stmt(f: &mut fmt::Formatter<'_>, stmt: &Stmt, indent: usize) -> fmt::Result {
    let pad = "    ".repeat(indent);
    match stmt {
        Stmt::Locks(s) => {
            write!(f, "{}locks (", pad)?;
            write_list(f, &s.locks)?;
            write!(f, ") ")?;
            write_block(f, &s.body, indent)?;
            writeln!(f)
        }
        Stmt::Enter(s) => {
            write!(f, "{}enter ", pad)?;
            write_list(f, &s.locks)?;
            writeln!(f, ";")
        }
        Stmt::Exit(_) => writeln!(f, "{}exit;", pad),
        Stmt::If(s) => {
            write!(f, "{}if {} ", pad, s.condition)?;
            write_block(f, &s.then_branch, indent)?;
            if let Some(else_branch) = &s.else_branch {
                write!(f, " else ")?;
                write_block(f, else_branch, indent)?;
            }
            writeln!(f)
        }
        Stmt::While(s) => {
            write!(f, "{}while {} ", pad, s.condition)?;
            write_block(f, &s.body, indent)?;
            writeln!(f)
        }
        Stmt::Return(s) => match &s.value {
            Some(value) => writeln!(f, "{}return {};", pad, value),
            None => writeln!(f, "{}return;", pad),
        },
        Stmt::Bind(s) => writeln!(f, "{}bind {} = {};", pad, s.slot, s.routine),
        Stmt::Assign(s) => writeln!(f, "{}{} = {};", pad, s.target, s.value),
        Stmt::Expr(s) => writeln!(f, "{}{};", pad, s.expr),
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_stmt(f, self, 0)
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::LockType(decl) => writeln!(f, "locktype {} level {};", decl.name, decl.level),
            Item::Lock(decl) => {
                write!(f, "lock {}", decl.target)?;
                if let Some(ty) = &decl.lock_type {
                    write!(f, " : {}", ty)?;
                }
                if let Some(level) = decl.level {
                    write!(f, " level {}", level)?;
                }
                writeln!(f, ";")
            }
            Item::Var(decl) => match &decl.guard {
                Some(GuardSpec::Lock(lock)) => writeln!(f, "var {} guarded by {};", decl.target, lock),
                Some(GuardSpec::Barrier) => writeln!(f, "var {} guarded by barrier;", decl.target),
                None => writeln!(f, "var {};", decl.target),
            },
            Item::Slot(decl) => writeln!(f, "slot {} effect {};", decl.name, decl.effect),
            Item::Routine(decl) => {
                write!(f, "proc {}({})", decl.name, decl.params.join(", "))?;
                if let Some(effect) = decl.effect {
                    write!(f, " effect {}", effect)?;
                }
                write!(f, " ")?;
                write_block(f, &decl.body, 0)?;
                writeln!(f)
            }
            Item::Stmt(stmt) => write!(f, "{}", stmt),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for item in &self.items {
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_expressions_print_token_form() {
        let i = Expr::ident("i");
        let plus_zero = Expr::Binary(BinaryExpr {
            left: Box::new(Expr::ident("i")),
            op: BinaryOp::Add,
            right: Box::new(Expr::Literal(LiteralExpr { value: 0, span: Default::default() })),
            span: Default::default(),
        });
        assert_eq!(Expr::ident("a").index(i).field("v").to_string(), "a[i].v");
        assert_eq!(Expr::ident("a").index(plus_zero).field("v").to_string(), "a[i + 0].v");
    }

    #[test]
    fn deref_prints_postfix() {
        assert_eq!(Expr::ident("p").deref().field("next").to_string(), "p^.next");
    }
}
