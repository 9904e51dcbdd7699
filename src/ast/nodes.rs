use super::{HasSpan, Span};

/// Root of a parsed lock-annotation program
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub items: Vec<Item>,
    pub span: Span,
}

impl Program {
    pub fn lock_types(&self) -> impl Iterator<Item = &LockTypeDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::LockType(decl) => Some(decl),
            _ => None,
        })
    }

    pub fn locks(&self) -> impl Iterator<Item = &LockDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Lock(decl) => Some(decl),
            _ => None,
        })
    }

    pub fn vars(&self) -> impl Iterator<Item = &VarDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Var(decl) => Some(decl),
            _ => None,
        })
    }

    pub fn slots(&self) -> impl Iterator<Item = &SlotDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Slot(decl) => Some(decl),
            _ => None,
        })
    }

    pub fn routines(&self) -> impl Iterator<Item = &RoutineDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Routine(decl) => Some(decl),
            _ => None,
        })
    }

    /// Statements outside any routine, in source order. These run in the
    /// module-initialization context.
    pub fn top_level(&self) -> Vec<&Stmt> {
        self.items
            .iter()
            .filter_map(|item| match item {
                Item::Stmt(stmt) => Some(stmt),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub enum Item {
    LockType(LockTypeDecl),
    Lock(LockDecl),
    Var(VarDecl),
    Slot(SlotDecl),
    Routine(RoutineDecl),
    Stmt(Stmt),
}

/// `locktype Mutex level 5;`
#[derive(Debug, Clone)]
pub struct LockTypeDecl {
    pub name: String,
    pub level: i64,
    pub span: Span,
}

/// `lock a level 2;` or `lock m : Mutex;`
#[derive(Debug, Clone)]
pub struct LockDecl {
    pub target: Expr,
    pub lock_type: Option<String>,
    pub level: Option<i64>,
    pub span: Span,
}

/// `var x guarded by a;`
#[derive(Debug, Clone)]
pub struct VarDecl {
    pub target: Expr,
    pub guard: Option<GuardSpec>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum GuardSpec {
    Lock(Expr),
    /// Level-0 placeholder for barrier-only guards
    Barrier,
}

/// `slot handler effect 4;` declares a routine-typed slot
#[derive(Debug, Clone)]
pub struct SlotDecl {
    pub name: String,
    pub effect: i64,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct RoutineDecl {
    pub name: String,
    pub params: Vec<String>,
    /// Explicit effect annotation; `None` means "infer"
    pub effect: Option<i64>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    /// Structured critical section: `locks (a, b) { ... }`
    Locks(LocksStmt),
    /// Explicit bracketing: `enter a, b;`
    Enter(EnterStmt),
    /// Explicit bracketing: `exit;`
    Exit(ExitStmt),
    If(IfStmt),
    While(WhileStmt),
    Return(ReturnStmt),
    Bind(BindStmt),
    Assign(AssignStmt),
    Expr(ExprStmt),
}

#[derive(Debug, Clone)]
pub struct LocksStmt {
    pub locks: Vec<Expr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct EnterStmt {
    pub locks: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ExitStmt {
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: Vec<Stmt>,
    pub else_branch: Option<Vec<Stmt>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

/// `bind slot = routine;`
#[derive(Debug, Clone)]
pub struct BindStmt {
    pub slot: String,
    pub routine: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct AssignStmt {
    pub target: Expr,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

impl HasSpan for Stmt {
    fn span(&self) -> Span {
        match self {
            Stmt::Locks(s) => s.span,
            Stmt::Enter(s) => s.span,
            Stmt::Exit(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::While(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Bind(s) => s.span,
            Stmt::Assign(s) => s.span,
            Stmt::Expr(s) => s.span,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Ident(IdentExpr),
    Literal(LiteralExpr),
    Field(FieldExpr),
    Index(IndexExpr),
    Deref(DerefExpr),
    Call(CallExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
}

#[derive(Debug, Clone)]
pub struct IdentExpr {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct LiteralExpr {
    pub value: i64,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FieldExpr {
    pub target: Box<Expr>,
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IndexExpr {
    pub target: Box<Expr>,
    pub index: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct DerefExpr {
    pub target: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub callee: String,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub op: BinaryOp,
    pub right: Box<Expr>,
    pub span: Span,
}

impl HasSpan for Expr {
    fn span(&self) -> Span {
        match self {
            Expr::Ident(e) => e.span,
            Expr::Literal(e) => e.span,
            Expr::Field(e) => e.span,
            Expr::Index(e) => e.span,
            Expr::Deref(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Binary(e) => e.span,
        }
    }
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(IdentExpr { name: name.into(), span: Span::default() })
    }

    pub fn field(self, name: impl Into<String>) -> Self {
        let span = self.span();
        Expr::Field(FieldExpr { target: Box::new(self), name: name.into(), span })
    }

    pub fn index(self, index: Expr) -> Self {
        let span = self.span();
        Expr::Index(IndexExpr { target: Box::new(self), index: Box::new(index), span })
    }

    pub fn deref(self) -> Self {
        let span = self.span();
        Expr::Deref(DerefExpr { target: Box::new(self), span })
    }

    /// Visit every call expression nested in `self`, outermost first.
    pub fn for_each_call<'a>(&'a self, f: &mut impl FnMut(&'a CallExpr)) {
        match self {
            Expr::Ident(_) | Expr::Literal(_) => {}
            Expr::Field(e) => e.target.for_each_call(f),
            Expr::Index(e) => {
                e.target.for_each_call(f);
                e.index.for_each_call(f);
            }
            Expr::Deref(e) => e.target.for_each_call(f),
            Expr::Call(call) => {
                f(call);
                for arg in &call.args {
                    arg.for_each_call(f);
                }
            }
            Expr::Unary(e) => e.operand.for_each_call(f),
            Expr::Binary(e) => {
                e.left.for_each_call(f);
                e.right.for_each_call(f);
            }
        }
    }
}
